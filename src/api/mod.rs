//! HTTP surface. Each handler module contributes its own `routes()`.

mod error;
mod handlers;
mod helpers;
mod router;
mod state;

pub use router::build_router;
pub use state::AppState;
