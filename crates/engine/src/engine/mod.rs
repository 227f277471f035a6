//! C5 — the LIFO stack driver: the heart of this crate.

mod stack_engine;

pub use stack_engine::{StackEngine, StackOutcome, StepOutcome};
