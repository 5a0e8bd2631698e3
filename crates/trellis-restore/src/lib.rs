//! Trellis Restore Library
//!
//! Boot-time state handling for a Trellis application:
//!
//! - [`VersionGate`] validates a state namespace against the running version and resets it
//!   on mismatch
//! - [`LayoutRestorer`] applies the saved layout exactly once after the host has started,
//!   then persists every layout change
//! - [`RestoreTracker`] records open widgets and reopens them through the command registry
//! - [`Session`] wires the three together, with the clear-state command
//!
//! The application side (shell, host, commands) is reached only through the traits in
//! `trellis_core::hooks`.

pub mod commands;
pub mod restorer;
pub mod session;
pub mod tracker;
pub mod version_gate;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use commands::{ClearStateCommand, CommandTable};
pub use restorer::{LayoutRestorer, RestoreReport, RestorerHandle, RestorerPhase};
pub use session::{Session, SessionBuilder};
pub use tracker::{RestoreEntry, RestoreTracker, TrackerReport};
pub use version_gate::{GateOutcome, GatedStore, ResetReason, VersionGate, VersionRecord};
