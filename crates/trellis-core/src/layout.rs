//! Layout types exchanged between the restorer and the shell.
//!
//! The snapshot itself is opaque JSON owned by the shell; the core only decides whether a
//! saved snapshot or the shell's default arrangement gets applied.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the restorer hands to the shell at boot.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoredLayout {
    /// A previously persisted snapshot
    Saved(Value),
    /// The shell's own default arrangement
    Default,
}

impl RestoredLayout {
    pub fn source(&self) -> LayoutSource {
        match self {
            RestoredLayout::Saved(_) => LayoutSource::Saved,
            RestoredLayout::Default => LayoutSource::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutSource {
    Saved,
    Default,
}

/// Why the default layout was used instead of a saved one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreSkipped {
    /// Nothing was stored under the layout key
    Absent,
    /// Reading the layout key failed
    FetchFailed,
    /// The shell rejected the saved snapshot
    ApplyFailed,
}

impl Display for RestoreSkipped {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RestoreSkipped::Absent => write!(f, "no saved layout"),
            RestoreSkipped::FetchFailed => write!(f, "saved layout could not be read"),
            RestoreSkipped::ApplyFailed => write!(f, "saved layout could not be applied"),
        }
    }
}
