//! One function per pipeline stage
//!
//! Each stage takes the outputs of the previous ones and either returns its
//! own output or a [`PipelineError`]. Only quality analysis degrades instead
//! of failing.

pub mod analyze;
pub mod merge;
pub mod publish;
pub mod synthesize;
pub mod transcribe;
pub mod translate;
pub mod upload;

use crate::error::PipelineError;

/// Keep typed pipeline errors raised inside an adapter, wrap anything else
/// in the stage's own variant.
pub(crate) fn adapter_failure(error: anyhow::Error, wrap: fn(String) -> PipelineError) -> PipelineError {
    match error.downcast::<PipelineError>() {
        Ok(inner) => inner,
        Err(other) => wrap(format!("{:#}", other)),
    }
}
