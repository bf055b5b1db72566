mod graph;
mod models;
mod permission;

pub use graph::*;
pub use models::*;
pub use permission::*;
