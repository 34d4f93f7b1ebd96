use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an environment in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvState {
    Unresolved,
    RuntimeResolved,
    ConfigWritten,
    Queried,
    Created,
    Reused,
    ClientBuilt,
    Ready,
    Destroyed,
    Failed,
}

impl fmt::Display for EnvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unresolved => "unresolved",
            Self::RuntimeResolved => "runtime_resolved",
            Self::ConfigWritten => "config_written",
            Self::Queried => "queried",
            Self::Created => "created",
            Self::Reused => "reused",
            Self::ClientBuilt => "client_built",
            Self::Ready => "ready",
            Self::Destroyed => "destroyed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: EnvState, to: EnvState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (
            EnvState::Unresolved | EnvState::Ready | EnvState::Failed | EnvState::Destroyed,
            EnvState::RuntimeResolved
        ) | (EnvState::RuntimeResolved, EnvState::ConfigWritten)
            | (EnvState::ConfigWritten, EnvState::Queried)
            | (EnvState::Queried, EnvState::Created | EnvState::Reused)
            | (EnvState::Created | EnvState::Reused, EnvState::ClientBuilt)
            | (EnvState::ClientBuilt, EnvState::Ready)
            | (_, EnvState::Destroyed | EnvState::Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
