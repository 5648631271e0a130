//! # Brainstem Core
//!
//! Domain types, traits, and error definitions for the Brainstem
//! coordination engine. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: capability
//! agents, the intent router, and the state store. Implementations live
//! in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod error;
pub mod intent;
pub mod state;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentInput, AgentOutput, CapabilityAgent, Visibility};
pub use error::{AgentError, Error, Result, StateError, StructuralError};
pub use intent::{IntentClassification, IntentRouter};
pub use state::{ProjectState, StateDelta, StateFingerprint, StateStore};
pub use turn::{ConversationTurn, TurnRole};
