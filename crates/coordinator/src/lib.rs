//! The Brainstem coordination engine.
//!
//! Each incoming request flows through one pipeline:
//!
//! 1. **Classify** the raw input to an intent (external capability)
//! 2. **Resolve** the intent to a workflow of agent steps
//! 3. **Schedule** the steps in order-preserving batches — consecutive
//!    steps marked parallel run concurrently, everything else strictly
//!    in sequence, with a barrier between batches
//! 4. **Merge** step outcomes into a single response, respecting each
//!    step's output visibility
//! 5. **Persist** the resulting delta fire-and-forget
//!
//! Individual agents are slow, remote, and individually unreliable; a
//! failing step never cancels its batch siblings and partial success is
//! a valid, expected response. Only structural problems — an unresolved
//! intent, an unknown workflow, a reference to an unregistered agent —
//! surface as errors.

pub mod condition;
pub mod outcome;
pub mod persist;
pub mod pruning;
pub mod scheduler;
pub mod service;
pub mod testing;
pub mod workflow;

pub use condition::StepCondition;
pub use outcome::{AggregatedResult, StepOutcome, StepStatus};
pub use persist::PersistQueue;
pub use pruning::{ContextPruner, PruningRule};
pub use scheduler::{RequestContext, Scheduler};
pub use service::{CoordinationService, FinalResponse, RequestPhase, StepSummary};
pub use workflow::{Workflow, WorkflowRegistry, WorkflowStep};
