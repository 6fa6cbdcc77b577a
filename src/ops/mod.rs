pub mod aggregate;
pub mod archive;
pub mod reducer;
pub mod session;
pub mod task_ops;
pub mod tree_ops;
pub mod user_ops;

pub use aggregate::{AllProjects, Totals, aggregate};
pub use reducer::{Op, OpContext, apply};
pub use session::{Session, SessionError};
pub use tree_ops::MoveDirection;
