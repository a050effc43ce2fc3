pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;
pub mod services;

pub use middleware::{protect, require_roles, GuardLayerState};
pub use models::*;
pub use services::*;
