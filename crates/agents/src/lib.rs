//! Capability agent implementations for Brainstem.
//!
//! Agents are opaque remote collaborators: the engine only ever speaks
//! the `CapabilityAgent` trait. This crate provides the HTTP-backed
//! implementation, the registry that holds all configured agents, and
//! the intent router that delegates classification to one of them.

pub mod http;
pub mod intent;
pub mod registry;

pub use http::HttpAgent;
pub use intent::ClassifierRouter;
pub use registry::{build_from_config, AgentRegistry};
