pub mod error;
pub mod handlers;
pub mod router;
pub mod session;
pub mod types;

pub use error::ApiError;
pub use router::create_router;
pub use session::{Role, Session};
pub use types::*;
