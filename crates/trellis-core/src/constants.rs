//! Well-known keys, command ids and defaults.

/// Namespace used when `TRELLIS_NAMESPACE` is not set.
pub const DEFAULT_NAMESPACE: &str = "trellis";

/// Key of the version record written by the version gate.
pub const VERSION_KEY: &str = "statedb:version";

/// Key of the persisted layout snapshot.
pub const LAYOUT_KEY: &str = "layout-restorer:data";

/// Separator between the encoded namespace and the caller's key in the medium.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Administrative command that wipes the state namespace.
pub const CLEAR_STATE_COMMAND_ID: &str = "apputils:clear-statedb";
pub const CLEAR_STATE_COMMAND_LABEL: &str = "Clear Application Restore State";

/// Directory of the local backend when `TRELLIS_STATE_DIR` is not set.
pub const DEFAULT_STATE_DIR: &str = ".trellis/state";

/// Default tracing filter when neither `RUST_LOG` nor `TRELLIS_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "trellis=info";
