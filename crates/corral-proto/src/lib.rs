//! Wire message and domain-type catalog for the corral scheduler driver.
//!
//! This crate is the structural stand-in for the protobuf message catalog a
//! real cluster-manager client would share with its master: `Address`,
//! `FrameworkInfo`, offers, tasks, and the inbound/outbound message shapes.
//! None of it depends on an actual wire encoding — encoding the messages
//! onto a socket is the job of whatever `ActorRuntime` implementation
//! `corral-core` is configured with.

pub mod address;
pub mod framework;
pub mod ids;
pub mod messages;
pub mod offer;
pub mod resource;
pub mod task;

pub use address::{Address, AddressParseError};
pub use framework::{Credential, FrameworkInfo};
pub use ids::{ExecutorId, FrameworkId, OfferId, SlaveId, TaskId};
pub use messages::Message;
pub use offer::{Filters, MasterInfo, Offer};
pub use resource::{Resource, ResourceRequest};
pub use task::{CommandInfo, ExecutorInfo, TaskInfo, TaskState, TaskStatus};
