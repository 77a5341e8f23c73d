//! The scheduler-side actor process and driver facade for a Mesos-style
//! cluster resource manager: registration/failover, resource offers, task
//! launch, and status-update delivery to a user-supplied [`Scheduler`].
//!
//! The wire-level actor runtime and the master detector are external
//! collaborators here, specified only at their trait boundaries
//! ([`ActorRuntime`], [`MasterDetector`]) — this crate owns the state
//! machine and bookkeeping that sits between them and the user's policy.

mod config;
mod detector;
mod driver;
mod error;
mod process;
mod runtime;
mod scheduler;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{DriverConfig, DEFAULT_MAILBOX_CAPACITY, INITIAL_BACKOFF, MASTER_DETECTION_RETRY, MAX_BACKOFF};
pub use detector::{MasterDetector, StaticDetector};
pub use driver::{DriverStatus, SchedulerDriver};
pub use error::{DetectorError, DetectorErrorKind, DriverStartError, DriverStartErrorKind};
pub use runtime::{ActorRuntime, LocalActorSystem, Mailbox};
pub use scheduler::Scheduler;
