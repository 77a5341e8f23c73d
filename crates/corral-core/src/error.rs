//! Public error types.
//!
//! Every public error follows the two-layer shape: a transparent struct the
//! caller matches on by `Display` alone, wrapping a private `...Kind` enum
//! that carries the actual variants. Callers who need to branch on the
//! specific failure reach for `.kind()`.

/// Returned by [`crate::detector::MasterDetector`] implementations.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct DetectorError(#[from] DetectorErrorKind);

impl DetectorError {
    pub fn kind(&self) -> &DetectorErrorKind {
        &self.0
    }

    pub fn uri(message: impl Into<String>) -> Self {
        Self(DetectorErrorKind::InvalidUri(message.into()))
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self(DetectorErrorKind::Unreachable(message.into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectorErrorKind {
    #[error("invalid master uri: {0}")]
    InvalidUri(String),
    #[error("master unreachable: {0}")]
    Unreachable(String),
}

/// Returned synchronously from [`crate::driver::SchedulerDriver::start`] when
/// the driver cannot even begin: a bad master URI never reaches the actor.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct DriverStartError(#[from] DriverStartErrorKind);

impl DriverStartError {
    pub fn kind(&self) -> &DriverStartErrorKind {
        &self.0
    }
}

impl From<DetectorError> for DriverStartError {
    fn from(err: DetectorError) -> Self {
        Self(DriverStartErrorKind::Detector(err))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverStartErrorKind {
    #[error("driver already started")]
    AlreadyStarted,
    #[error("failed constructing master detector")]
    Detector(#[source] DetectorError),
}

/// Why a task was rejected during `launch_tasks` validation (`spec.md` §4.1
/// step 3). Never surfaced as a `Result` — it only ever backs the message
/// string of a locally-synthesized `TASK_LOST` status update, so the three
/// reason strings live in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MalformedTaskReason {
    MissingExecutorOrCommand,
    ExecutorFrameworkIdMismatch,
}

impl MalformedTaskReason {
    pub(crate) fn message(self) -> &'static str {
        match self {
            Self::MissingExecutorOrCommand => {
                "Malformed: A task must have either an executor or command"
            }
            Self::ExecutorFrameworkIdMismatch => "Malformed: Executor has an invalid framework ID",
        }
    }
}
