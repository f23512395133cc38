// HTTP server setup (Axum)
pub mod app;
pub mod middleware;
pub mod ops;

pub use app::*;
