use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::domain::RecordIdentity;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::MigrationLog;

/// Lifecycle of one record's migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Fetched,
    Transformed,
    Submitted,
    Resolving,
    /// Accepted by the destination, resolution happens out of band
    Processing,
    Succeeded,
    Failed,
}

impl RecordState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordState::Succeeded | RecordState::Failed)
    }

    pub fn can_transition_to(self, next: RecordState) -> bool {
        use RecordState::*;

        match (self, next) {
            (Succeeded | Failed, _) => false,
            (_, Failed) => true,
            (Fetched, Transformed) => true,
            (Transformed, Submitted) => true,
            (Submitted, Resolving | Processing) => true,
            (Processing, Resolving) => true,
            (Resolving, Succeeded) => true,
            _ => false,
        }
    }

    pub fn advance(self, next: RecordState) -> AppResult<RecordState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::Internal(format!(
                "Invalid record state transition {} -> {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordState::Fetched => "fetched",
            RecordState::Transformed => "transformed",
            RecordState::Submitted => "submitted",
            RecordState::Resolving => "resolving",
            RecordState::Processing => "processing",
            RecordState::Succeeded => "succeeded",
            RecordState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A record moving through `RecordState`, logging every transition
#[derive(Debug, Clone)]
pub struct RecordRun {
    pub identity: RecordIdentity,
    state: RecordState,
}

impl RecordRun {
    pub fn new(identity: RecordIdentity) -> Self {
        Self::at(identity, RecordState::Fetched)
    }

    /// Pick up a record that was left in `state`
    pub fn at(identity: RecordIdentity, state: RecordState) -> Self {
        Self { identity, state }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn advance(&mut self, next: RecordState) -> AppResult<()> {
        let from = self.state;
        self.state = from.advance(next)?;
        MigrationLog::transition(&self.identity, &from, &next);
        Ok(())
    }

    /// Move to `Failed` from wherever the record is
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            MigrationLog::transition(&self.identity, &self.state, &RecordState::Failed);
            self.state = RecordState::Failed;
        }
    }
}
