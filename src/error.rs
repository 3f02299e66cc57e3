//! Error types for the few fallible edges of the core
//!
//! Steady-state simulation never fails; these only surface from strict-mode
//! encounter transitions and configuration loading.

use std::fmt;

use crate::sim::EncounterState;

/// Rejected encounter transition (strict mode only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    Illegal {
        from: EncounterState,
        to: EncounterState,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Illegal { from, to } => {
                write!(f, "illegal encounter transition: {from:?} -> {to:?}")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Settings/tuning could not be loaded
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "config parse error: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}
