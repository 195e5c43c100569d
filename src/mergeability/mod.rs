//! Mergeability waiting
//!
//! GitHub computes `mergeable_state` lazily, so actions that depend on it
//! poll until the state settles or a fixed budget runs out.

mod waiter;

pub use waiter::{MergeabilityWaiter, WaitOutcome, WaitPhase, WaitSession};
