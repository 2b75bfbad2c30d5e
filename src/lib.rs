//! Learning-progression core for a vocabulary-learning application.
//!
//! The crate owns the decisions that make a learning session coherent:
//! when a word comes back for review (fixed-point SM-2), how mastery per
//! word advances, which missed words land in the deduplicated wrong book,
//! how events translate into experience/coins/levels, and the per-day
//! counters behind streaks and leaderboards. [`engine::ProgressionEngine`]
//! sequences those pieces for each event and guarantees that concurrent
//! submissions for one learner linearize and commit atomically.
//!
//! Transport, persistence technology, auth and UI are external
//! collaborators: hosts call the engine and plug storage in through
//! [`store::ProgressionStore`] ([`store::MemoryStore`] is the in-process
//! reference implementation).

pub mod config;
pub mod daily;
pub mod engine;
pub mod error;
pub mod logging;
pub mod progress;
pub mod reward;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod wrongbook;

pub use config::ProgressionConfig;
pub use engine::ProgressionEngine;
pub use error::CoreError;
pub use store::{MemoryStore, ProgressionStore};
