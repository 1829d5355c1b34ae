mod vector3;
mod body;

pub use vector3::*;
pub use body::*;

#[cfg(test)]
mod vector3_tests;
