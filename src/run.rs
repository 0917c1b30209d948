//! Per-run stage tracking.
//!
//! Every pipeline invocation walks a fixed, linear list of stages. The
//! [`Run`] tracker records where it is, logs transitions, and attributes any
//! failure to the stage that produced it.

use crate::error::{Result, TrizipError};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Which direction the pipeline runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Secure,
    Restore,
}

impl Operation {
    /// Stages in execution order
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Self::Secure => &[
                Stage::Archiving,
                Stage::Compressing,
                Stage::Sealing,
                Stage::Partitioning,
                Stage::Embedding,
            ],
            Self::Restore => &[
                Stage::Extracting,
                Stage::Reassembling,
                Stage::Unsealing,
                Stage::Decompressing,
                Stage::Unarchiving,
            ],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secure => f.write_str("secure"),
            Self::Restore => f.write_str("restore"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Archiving,
    Compressing,
    Sealing,
    Partitioning,
    Embedding,
    Extracting,
    Reassembling,
    Unsealing,
    Decompressing,
    Unarchiving,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Archiving => "archiving",
            Self::Compressing => "compressing",
            Self::Sealing => "sealing",
            Self::Partitioning => "partitioning",
            Self::Embedding => "embedding",
            Self::Extracting => "extracting",
            Self::Reassembling => "reassembling",
            Self::Unsealing => "unsealing",
            Self::Decompressing => "decompressing",
            Self::Unarchiving => "unarchiving",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running(Stage),
    Done,
    Failed(Stage),
}

/// Tracks a single pipeline invocation from `Idle` to `Done` or `Failed`
#[derive(Debug)]
pub struct Run {
    operation: Operation,
    state: RunState,
    next: usize,
}

impl Run {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            state: RunState::Idle,
            next: 0,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute one stage. Stages must be entered in order and a failed run
    /// accepts no further stages.
    pub fn stage<T>(&mut self, stage: Stage, work: impl FnOnce() -> Result<T>) -> Result<T> {
        let expected = self.operation.stages().get(self.next).copied();
        if matches!(self.state, RunState::Failed(_) | RunState::Done) || expected != Some(stage) {
            return Err(TrizipError::InvalidInput(format!(
                "{} run cannot enter stage {} from {:?}",
                self.operation, stage, self.state
            )));
        }

        self.state = RunState::Running(stage);
        debug!(operation = %self.operation, %stage, "stage started");

        match work() {
            Ok(value) => {
                self.next += 1;
                debug!(operation = %self.operation, %stage, "stage finished");
                Ok(value)
            }
            Err(err) => {
                self.state = RunState::Failed(stage);
                warn!(operation = %self.operation, %stage, error = %err, "stage failed");
                Err(err.at_stage(stage))
            }
        }
    }

    /// Mark the run complete; every stage must have run
    pub fn finish(&mut self) -> Result<()> {
        if self.next != self.operation.stages().len() {
            return Err(TrizipError::InvalidInput(format!(
                "{} run finished after {} of {} stages",
                self.operation,
                self.next,
                self.operation.stages().len()
            )));
        }
        self.state = RunState::Done;
        info!(operation = %self.operation, "run complete");
        Ok(())
    }
}

/// Attach stage context to results produced outside a [`Run`], such as file
/// I/O around the in-memory pipeline.
pub trait StageExt<T> {
    fn at(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<TrizipError>> StageExt<T> for std::result::Result<T, E> {
    fn at(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.into().at_stage(stage))
    }
}
