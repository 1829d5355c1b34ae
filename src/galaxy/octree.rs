use log::debug;
use crate::models::{Body, Vector3};
use crate::utils::{GalaxyError, MIN_HALF_SIZE};

/// Relative margin added around the bounding cube of all bodies.
const BOUNDS_MARGIN: f64 = 1.05;

/// Represents an axis-aligned cubic region of 3D space.
///
/// Each `Cube` has a center and a half-size, which is half the length of one edge.
/// The cube is inclusive on its lower faces and exclusive on its upper faces.
///
/// # Examples
///
/// ```
/// use rs_galaxy::galaxy::Cube;
/// use rs_galaxy::models::Vector3;
///
/// let cube = Cube { center: Vector3::ZERO, half_size: 1.0 };
///
/// assert!(cube.contains(Vector3::new(0.5, -0.5, 0.9)));
/// assert!(!cube.contains(Vector3::new(1.0, 0.0, 0.0))); // upper face is exclusive
/// assert_eq!(cube.width(), 2.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cube {
    pub center: Vector3,
    pub half_size: f64,
}

impl Cube {
    /// Returns true if the point is inside this cube.
    pub fn contains(&self, p: Vector3) -> bool {
        let h = self.half_size;
        p.x >= self.center.x - h && p.x < self.center.x + h &&
            p.y >= self.center.y - h && p.y < self.center.y + h &&
            p.z >= self.center.z - h && p.z < self.center.z + h
    }

    /// Edge length of the cube.
    #[inline]
    pub fn width(&self) -> f64 {
        2.0 * self.half_size
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        let w = self.width();
        w * w * w
    }

    /// Index of the octant containing `p`.
    ///
    /// Bit 0 is set when `p.x >= center.x`, bit 1 for y and bit 2 for z.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_galaxy::galaxy::Cube;
    /// use rs_galaxy::models::Vector3;
    ///
    /// let cube = Cube { center: Vector3::ZERO, half_size: 1.0 };
    /// assert_eq!(cube.octant(Vector3::new(-0.5, -0.5, -0.5)), 0);
    /// assert_eq!(cube.octant(Vector3::new(0.5, -0.5, -0.5)), 1);
    /// assert_eq!(cube.octant(Vector3::new(0.5, 0.5, 0.5)), 7);
    /// ```
    #[inline]
    pub fn octant(&self, p: Vector3) -> usize {
        let mut index = 0;
        if p.x >= self.center.x { index |= 1; }
        if p.y >= self.center.y { index |= 2; }
        if p.z >= self.center.z { index |= 4; }
        index
    }

    /// The sub-cube for the given octant index.
    pub fn child(&self, octant: usize) -> Cube {
        let q = self.half_size / 2.0;
        let offset = |bit: usize| if octant & bit != 0 { q } else { -q };
        Cube {
            center: Vector3::new(
                self.center.x + offset(1),
                self.center.y + offset(2),
                self.center.z + offset(4),
            ),
            half_size: q,
        }
    }

    /// Smallest cube enclosing every position, padded by a small margin.
    ///
    /// Returns the cube and whether the extent had to be padded to [`MIN_HALF_SIZE`].
    pub fn enclosing(bodies: &[Body]) -> (Cube, bool) {
        let mut lo = Vector3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut hi = Vector3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for body in bodies {
            lo = lo.min(&body.position);
            hi = hi.max(&body.position);
        }
        if bodies.is_empty() {
            return (Cube { center: Vector3::ZERO, half_size: MIN_HALF_SIZE }, true);
        }

        let center = (lo + hi) * 0.5;
        let half_size = 0.5 * (hi - lo).max_component() * BOUNDS_MARGIN;
        if half_size.is_finite() && half_size >= MIN_HALF_SIZE {
            (Cube { center, half_size }, false)
        } else {
            (Cube { center, half_size: MIN_HALF_SIZE }, true)
        }
    }
}

/// What an octree node holds.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeContent {
    /// No body has been inserted yet.
    Empty,
    /// Exactly one body, by index into the body slice.
    Leaf(usize),
    /// Colocated bodies merged at the maximum depth.
    Aggregate(Vec<usize>),
    /// Up to eight children, by index into the node arena. Octants without bodies stay `None`.
    Internal([Option<usize>; 8]),
}

/// A node of the octree arena.
#[derive(Clone, Debug)]
pub struct OctreeNode {
    pub bounds: Cube,
    pub total_mass: f64,
    pub center_of_mass: Vector3,
    pub depth: usize,
    pub content: NodeContent,
}

impl OctreeNode {
    fn empty(bounds: Cube, depth: usize) -> Self {
        Self {
            bounds,
            total_mass: 0.0,
            center_of_mass: Vector3::ZERO,
            depth,
            content: NodeContent::Empty,
        }
    }

    /// Folds one more body into the running mass and mass-weighted centroid.
    #[inline]
    fn accumulate(&mut self, position: Vector3, mass: f64) {
        let total = self.total_mass + mass;
        if total > 0.0 {
            self.center_of_mass = (self.center_of_mass * self.total_mass + position * mass) / total;
        } else {
            self.center_of_mass = position;
        }
        self.total_mass = total;
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leaf(_) | NodeContent::Aggregate(_))
    }
}

/// Counters describing how a tree was built. Degenerate bounds and depth-capped merges are
/// not errors, but they mean the approximation deviates from plain Barnes-Hut.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub node_count: usize,
    pub max_depth_reached: usize,
    pub degenerate_bounds: u64,
    pub capacity_exceeded: u64,
}

impl TreeStats {
    /// Adds the counters of another build; node count and depth keep the latest/maximum.
    pub fn accumulate(&mut self, other: &TreeStats) {
        self.node_count = other.node_count;
        self.max_depth_reached = self.max_depth_reached.max(other.max_depth_reached);
        self.degenerate_bounds += other.degenerate_bounds;
        self.capacity_exceeded += other.capacity_exceeded;
    }
}

enum Insertion {
    Fill,
    Split(usize),
    Merge,
    Descend,
}

/// Barnes-Hut octree stored as an arena of nodes addressed by index.
///
/// The tree holds body indices only. Every query must be given the same body slice that
/// was used to build it. The whole arena is dropped after the force pass.
///
/// # Examples
///
/// ```
/// use rs_galaxy::galaxy::Octree;
/// use rs_galaxy::models::{Body, BodyKind, Vector3};
///
/// let bodies = vec![
///     Body::new(Vector3::new(1.0, 0.0, 0.0), Vector3::ZERO, 1.0, BodyKind::Disk),
///     Body::new(Vector3::new(-1.0, 0.0, 0.0), Vector3::ZERO, 1.0, BodyKind::Disk),
/// ];
/// let tree = Octree::build(&bodies, 20);
/// assert_eq!(tree.total_mass(), 2.0);
///
/// // The two bodies pull a test mass at the origin equally in opposite directions.
/// let f = tree.compute_force(&bodies, None, Vector3::ZERO, 1.0, 1.0, 0.0, 0.5);
/// assert!(f.norm() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    max_depth: usize,
    stats: TreeStats,
}

impl Octree {
    /// Builds the tree by inserting every body in slice order.
    ///
    /// An empty slice yields an empty tree whose force queries all return zero.
    pub fn build(bodies: &[Body], max_depth: usize) -> Octree {
        let mut tree = Octree {
            nodes: Vec::with_capacity(2 * bodies.len() + 1),
            max_depth,
            stats: TreeStats::default(),
        };
        if bodies.is_empty() {
            return tree;
        }

        let (bounds, padded) = Cube::enclosing(bodies);
        if padded {
            tree.stats.degenerate_bounds += 1;
            debug!("{} (half size {})", GalaxyError::DegenerateGeometry, bounds.half_size);
        }
        tree.nodes.push(OctreeNode::empty(bounds, 0));

        for index in 0..bodies.len() {
            tree.insert(bodies, index);
        }
        tree.stats.node_count = tree.nodes.len();
        tree
    }

    /// Inserts body `index`, updating the aggregates of every node on its path.
    fn insert(&mut self, bodies: &[Body], index: usize) {
        let position = bodies[index].position;
        let mass = bodies[index].mass;
        let mut current = 0;

        loop {
            let depth = self.nodes[current].depth;
            let action = match &self.nodes[current].content {
                NodeContent::Empty => Insertion::Fill,
                NodeContent::Leaf(existing) if depth < self.max_depth => Insertion::Split(*existing),
                NodeContent::Leaf(_) | NodeContent::Aggregate(_) => Insertion::Merge,
                NodeContent::Internal(_) => Insertion::Descend,
            };

            match action {
                Insertion::Fill => {
                    let node = &mut self.nodes[current];
                    node.content = NodeContent::Leaf(index);
                    node.accumulate(position, mass);
                    return;
                }
                Insertion::Merge => {
                    let node = &mut self.nodes[current];
                    match &mut node.content {
                        NodeContent::Aggregate(members) => members.push(index),
                        NodeContent::Leaf(existing) => {
                            let existing = *existing;
                            node.content = NodeContent::Aggregate(vec![existing, index]);
                        }
                        _ => unreachable!("merge only applies to leaves"),
                    }
                    node.accumulate(position, mass);
                    self.stats.capacity_exceeded += 1;
                    debug!("{}", GalaxyError::CapacityExceeded { depth });
                    return;
                }
                Insertion::Split(existing) => {
                    // The node keeps its aggregates; the resident body moves one level down
                    // and the loop continues with the node as an internal node.
                    let bounds = self.nodes[current].bounds;
                    let octant = bounds.octant(bodies[existing].position);
                    let mut child = OctreeNode::empty(bounds.child(octant), depth + 1);
                    child.content = NodeContent::Leaf(existing);
                    child.accumulate(bodies[existing].position, bodies[existing].mass);

                    let child_index = self.push_node(child);
                    let mut children = [None; 8];
                    children[octant] = Some(child_index);
                    self.nodes[current].content = NodeContent::Internal(children);
                }
                Insertion::Descend => {
                    self.nodes[current].accumulate(position, mass);
                    let bounds = self.nodes[current].bounds;
                    let octant = bounds.octant(position);
                    let next = match &self.nodes[current].content {
                        NodeContent::Internal(children) => children[octant],
                        _ => unreachable!("descend only applies to internal nodes"),
                    };
                    current = match next {
                        Some(child) => child,
                        None => {
                            let child_index = self.push_node(OctreeNode::empty(bounds.child(octant), depth + 1));
                            if let NodeContent::Internal(children) = &mut self.nodes[current].content {
                                children[octant] = Some(child_index);
                            }
                            child_index
                        }
                    };
                }
            }
        }
    }

    fn push_node(&mut self, node: OctreeNode) -> usize {
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(node.depth);
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Computes the approximate gravitational force on a mass at `position`.
    ///
    /// `query` is the index of the body being evaluated, so that it exerts no force on itself;
    /// pass `None` for an arbitrary test mass. Internal nodes whose `width / distance` ratio is
    /// below `theta` are treated as point masses at their center of mass, unless the query
    /// point lies inside the node. All interactions use the softened law
    /// `G m_i m_j d / (|d|² + ε²)^{3/2}`.
    pub fn compute_force(
        &self,
        bodies: &[Body],
        query: Option<usize>,
        position: Vector3,
        mass: f64,
        g: f64,
        softening: f64,
        theta: f64,
    ) -> Vector3 {
        let mut force = Vector3::ZERO;
        if self.nodes.is_empty() {
            return force;
        }
        let eps2 = softening * softening;
        let gm = g * mass;

        let mut stack: Vec<usize> = Vec::with_capacity(64);
        stack.push(0);
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            match &node.content {
                NodeContent::Empty => {}
                NodeContent::Leaf(j) => {
                    if query != Some(*j) {
                        force += softened_pull(position, bodies[*j].position, gm * bodies[*j].mass, eps2);
                    }
                }
                NodeContent::Aggregate(members) => {
                    for &j in members {
                        if query != Some(j) {
                            force += softened_pull(position, bodies[j].position, gm * bodies[j].mass, eps2);
                        }
                    }
                }
                NodeContent::Internal(children) => {
                    let distance = (node.center_of_mass - position).norm();
                    let far_enough = distance > 0.0
                        && !node.bounds.contains(position)
                        && node.bounds.width() / distance < theta;
                    if far_enough {
                        force += softened_pull(position, node.center_of_mass, gm * node.total_mass, eps2);
                    } else {
                        stack.extend(children.iter().rev().flatten());
                    }
                }
            }
        }
        force
    }

    /// Mass of each body's leaf cell divided by the cell volume.
    ///
    /// Bodies that share an aggregate leaf share its density. Indices not present in the tree
    /// (never the case for a tree built from `bodies`) are left at zero.
    pub fn local_densities(&self, bodies: &[Body]) -> Vec<f64> {
        let mut densities = vec![0.0; bodies.len()];
        for node in &self.nodes {
            let density = node.total_mass / node.bounds.volume();
            match &node.content {
                NodeContent::Leaf(j) => densities[*j] = density,
                NodeContent::Aggregate(members) => {
                    for &j in members {
                        densities[j] = density;
                    }
                }
                _ => {}
            }
        }
        densities
    }

    pub fn root(&self) -> Option<&OctreeNode> {
        self.nodes.first()
    }

    pub fn node(&self, index: usize) -> Option<&OctreeNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.root().map_or(0.0, |root| root.total_mass)
    }

    pub fn center_of_mass(&self) -> Vector3 {
        self.root().map_or(Vector3::ZERO, |root| root.center_of_mass)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_depth_reached(&self) -> usize {
        self.stats.max_depth_reached
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }
}

/// Softened attraction toward `source`, with `gmm` = G·m_query·m_source.
#[inline]
pub(crate) fn softened_pull(position: Vector3, source: Vector3, gmm: f64, eps2: f64) -> Vector3 {
    let d = source - position;
    let r2 = d.norm_squared() + eps2;
    if r2 == 0.0 {
        return Vector3::ZERO;
    }
    let inv_r = 1.0 / r2.sqrt();
    d * (gmm * inv_r * inv_r * inv_r)
}
