//! The message domain: the record model and its HTTP surface.

pub mod model;
pub mod routes;

pub use model::{Message, MessageStatus, StatusCounts};
