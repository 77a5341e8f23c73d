use std::{collections::BTreeMap, fmt};

use uuid::Uuid;

use crate::{
    ids::{ExecutorId, FrameworkId, SlaveId, TaskId},
    resource::Resource,
};

/// A shell command to execute, used by command-style tasks and by executors
/// that are launched as a bare process rather than a custom executor binary.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandInfo {
    pub value: String,
    pub uris: Vec<String>,
    pub environment: BTreeMap<String, String>,
}

/// An executor a task can run under. `framework_id` is optional on input —
/// `launch_tasks` fills it in with the driver's own id when absent (see
/// `spec.md` §4.1 step 3).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutorInfo {
    pub executor_id: ExecutorId,
    pub framework_id: Option<FrameworkId>,
    pub command: CommandInfo,
    pub resources: Vec<Resource>,
}

/// A task to launch against a specific offer's slave.
///
/// Exactly one of `executor` or `command` must be set for the task to be
/// well-formed; `corral_core::process` enforces this at launch time rather
/// than at construction, matching the original's permissive constructor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub name: String,
    pub slave_id: SlaveId,
    pub resources: Vec<Resource>,
    pub executor: Option<ExecutorInfo>,
    pub command: Option<CommandInfo>,
}

/// A task's state, as carried on a `TaskStatus`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskState {
    Staging,
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
    Error,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Staging => "TASK_STAGING",
            TaskState::Starting => "TASK_STARTING",
            TaskState::Running => "TASK_RUNNING",
            TaskState::Finished => "TASK_FINISHED",
            TaskState::Failed => "TASK_FAILED",
            TaskState::Killed => "TASK_KILLED",
            TaskState::Lost => "TASK_LOST",
            TaskState::Error => "TASK_ERROR",
        };
        f.write_str(s)
    }
}

/// A task's state transition, as delivered by `StatusUpdateMessage` or
/// synthesized locally (see `spec.md` §4.1 "local TASK_LOST loop-back").
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskStatus {
    pub task_id: TaskId,
    pub state: TaskState,
    pub message: String,
    pub slave_id: Option<SlaveId>,
    pub executor_id: Option<ExecutorId>,
    pub source_is_local: bool,
    pub uuid: Uuid,
}

impl TaskStatus {
    /// Builds a locally-synthesized `TASK_LOST` update, as produced by
    /// `launch_tasks` when disconnected or validating a malformed task.
    pub fn local_lost(task_id: TaskId, reason: impl Into<String>) -> Self {
        Self {
            task_id,
            state: TaskState::Lost,
            message: reason.into(),
            slave_id: None,
            executor_id: None,
            source_is_local: true,
            uuid: Uuid::new_v4(),
        }
    }
}
