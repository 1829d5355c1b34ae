pub mod errors;
mod constants;
mod constants_config;
mod math_helpers;

pub use errors::GalaxyError;
pub use constants::*;
pub use constants_config::*;
pub use math_helpers::*;
