//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     One timer per backend
//!     → GET <path> with a bounded timeout
//!     → state.rs (apply outcome to the server pool)
//!
//! Pool membership (state.rs):
//!     In pool ←→ Out of pool
//!     Every probe decides on its own
//! ```
//!
//! # Design Decisions
//! - Probing tasks are independent; a stuck or dead backend delays nobody else
//! - Connection errors, timeouts and non-200 statuses are treated alike
//! - Backends are never dropped from monitoring, so they can come back

pub mod active;
pub mod state;

pub use active::{HealthMonitor, Prober};
pub use state::{ProbeFailure, ProbeOutcome, Transition};
