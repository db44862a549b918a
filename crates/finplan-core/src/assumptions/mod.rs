pub mod model;
pub mod registry;

pub use model::*;
pub use registry::{get, get_latest, list};
