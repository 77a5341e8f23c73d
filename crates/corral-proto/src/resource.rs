/// A slice of a resource a slave is offering, or a framework is requesting.
/// Mirrors the three Mesos resource shapes (scalar, range, set) without
/// attempting to be a complete resource-algebra implementation — arithmetic
/// over resources is scheduler policy, out of this core's scope.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Resource {
    Scalar { name: String, value: f64 },
    Ranges { name: String, ranges: Vec<(u64, u64)> },
    Set { name: String, items: Vec<String> },
}

impl Resource {
    pub fn name(&self) -> &str {
        match self {
            Resource::Scalar { name, .. } => name,
            Resource::Ranges { name, .. } => name,
            Resource::Set { name, .. } => name,
        }
    }
}

/// A resource request submitted out-of-band of any offer cycle (see
/// `SchedulerDriver::request_resources`).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceRequest {
    pub role: String,
    pub resources: Vec<Resource>,
}
