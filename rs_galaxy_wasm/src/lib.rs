// rs_galaxy_wasm/src/lib.rs
// Browser-facing wrapper around the galaxy simulation.

use wasm_bindgen::prelude::*;
use rs_galaxy::galaxy::{GalaxySimulation, StateSnapshot};
use rs_galaxy::utils::SimulationParams;

#[wasm_bindgen]
pub struct WasmGalaxy {
    simulation: GalaxySimulation,
    snapshot: StateSnapshot,
}

#[wasm_bindgen]
impl WasmGalaxy {
    /// `config` is YAML or JSON with camelCase keys; empty text uses the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: &str, seed: Option<u64>) -> Result<WasmGalaxy, JsValue> {
        let params = SimulationParams::from_yaml_str(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let (simulation, snapshot) = GalaxySimulation::initialize(params, seed)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self { simulation, snapshot })
    }

    /// Advances the simulation. On failure the last good state stays visible.
    #[wasm_bindgen]
    pub fn advance(&mut self, steps: u32) -> Result<(), JsValue> {
        match self.simulation.advance(steps as usize) {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                web_sys::console::warn_1(&JsValue::from_str(&message));
                self.snapshot = err.snapshot;
                Err(JsValue::from_str(&message))
            }
        }
    }

    #[wasm_bindgen]
    pub fn positions(&self) -> js_sys::Float32Array {
        js_sys::Float32Array::from(self.snapshot.positions.as_slice())
    }

    #[wasm_bindgen]
    pub fn colors(&self) -> js_sys::Float32Array {
        js_sys::Float32Array::from(self.snapshot.colors.as_slice())
    }

    #[wasm_bindgen]
    pub fn kinds(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.snapshot.kinds.as_slice())
    }

    /// Flattened invariants, in the order of `Invariants::to_array`.
    #[wasm_bindgen]
    pub fn invariants(&self) -> js_sys::Float64Array {
        js_sys::Float64Array::from(&self.simulation.invariants().to_array()[..])
    }

    #[wasm_bindgen]
    pub fn snapshot_bytes(&self) -> Vec<u8> {
        self.snapshot.to_bytes()
    }

    #[wasm_bindgen(getter)]
    pub fn step(&self) -> f64 {
        self.snapshot.step as f64
    }

    #[wasm_bindgen(getter)]
    pub fn time(&self) -> f64 {
        self.snapshot.time
    }

    #[wasm_bindgen(getter)]
    pub fn body_count(&self) -> usize {
        self.snapshot.body_count
    }

    #[wasm_bindgen(getter)]
    pub fn rendered_count(&self) -> usize {
        self.snapshot.len()
    }
}
