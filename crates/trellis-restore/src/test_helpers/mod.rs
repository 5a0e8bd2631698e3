//! Test helpers for restore unit tests
//!
//! Mock implementations of the persistence medium and of the host-side collaborators
//! (shell, host application, commands), so the gate and the restorer can be driven
//! step by step.

pub mod mock_host;
pub mod mock_medium;

pub use mock_host::*;
pub use mock_medium::*;

use std::sync::Arc;
use trellis_storage::StateDb;

/// A state database in the `app-x` namespace over `medium`
pub fn state_db_over(medium: &MockMedium) -> StateDb {
    StateDb::new(Arc::new(medium.clone()), "app-x").unwrap()
}

/// Poll `$cond` until it holds, failing the test after two seconds.
macro_rules! eventually {
    ($cond:expr) => {{
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
        loop {
            if $cond {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition never held: {}",
                stringify!($cond)
            );
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }};
}
pub(crate) use eventually;
