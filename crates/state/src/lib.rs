//! State store backends for Brainstem.
//!
//! The durable record store lives outside this system; the engine only
//! needs the `StateStore` contract from `brainstem-core`. This crate
//! ships the in-memory backend used for development, tests, and
//! single-process deployments.

pub mod in_memory;

pub use in_memory::InMemoryStateStore;
