pub mod config;
pub mod error;
pub mod math;

pub use config::BlueprintConfig;
pub use error::{BlueprintError, Result};
pub use math::Aabb;
