//! The HTTP surface (§6.1), gated behind the `http` feature the same way
//! the teacher gates its own UI surface behind `ui`.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
