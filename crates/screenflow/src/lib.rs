//! Durable workflow orchestration for rental application screening.
//!
//! The [`workflows::application`] module hosts the six-step review pipeline:
//! document extraction, fraud scoring, routing, human review, background
//! check, and finalization. Progress is checkpointed through an injected
//! store so interrupted runs resume from persisted state alone.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
