// src/errors.rs

//! Crate-wide error types and helpers.

use thiserror::Error;

use crate::program::Request;
use crate::target::DeviceId;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("invalid program: {0}")]
    InvalidProgram(String),

    #[error("cycle detected in instruction graph: {0}")]
    Cycle(String),

    #[error("no device can handle constraints {0}")]
    NoDevice(Request),

    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    #[error("device {device} failed to compile its run: {source}")]
    Device {
        device: DeviceId,
        source: anyhow::Error,
    },

    #[error("multiple incubates or multiple mixes not supported")]
    MultipleSetup,

    #[error("error {stage}: {source}")]
    Stage {
        stage: &'static str,
        source: Box<CodegenError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CodegenError {
    /// Wrap an error with the name of the pipeline stage it surfaced in.
    pub(crate) fn stage(stage: &'static str) -> impl FnOnce(CodegenError) -> CodegenError {
        move |source| CodegenError::Stage {
            stage,
            source: Box::new(source),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CodegenError>;
