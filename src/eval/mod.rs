//! The evaluator (C5): the cascade engine and its work queue.

pub mod cascade;
pub mod queue;

pub use cascade::{EngineConfig, Evaluator};
pub use queue::WorkQueue;
