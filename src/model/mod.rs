pub mod config;
pub mod document;
pub mod outline;
pub mod project;
pub mod task;
pub mod user;

pub use config::*;
pub use document::*;
pub use outline::*;
pub use project::*;
pub use task::*;
pub use user::*;
