// Common test utilities

pub mod harness;
pub mod processors;
pub mod queues;

pub use harness::*;
pub use processors::*;
pub use queues::*;
