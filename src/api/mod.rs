//! API Module
//!
//! HTTP handlers and routing over the hotel and user cache chains.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
