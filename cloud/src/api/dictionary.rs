//! Remote enumerations and their integer wire codes
//!
//! These codes belong to the platform's API contract. Configuration uses the
//! lowercase names; requests and responses carry the codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a ticket (compute API) or an operation (Kubernetes API)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum TicketStatus {
    New,
    Running,
    Succeeded,
    Error,
    Unknown(u32),
}

impl TicketStatus {
    pub const NEW: u32 = 1;
    pub const RUNNING: u32 = 2;
    pub const SUCCEEDED: u32 = 3;
    pub const ERROR: u32 = 4;

    pub fn code(self) -> u32 {
        match self {
            TicketStatus::New => Self::NEW,
            TicketStatus::Running => Self::RUNNING,
            TicketStatus::Succeeded => Self::SUCCEEDED,
            TicketStatus::Error => Self::ERROR,
            TicketStatus::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::Running => "running",
            TicketStatus::Succeeded => "succeeded",
            TicketStatus::Error => "error",
            TicketStatus::Unknown(_) => "unknown",
        }
    }

    pub fn is_success(self) -> bool {
        self == TicketStatus::Succeeded
    }
}

impl From<u32> for TicketStatus {
    fn from(code: u32) -> Self {
        match code {
            Self::NEW => TicketStatus::New,
            Self::RUNNING => TicketStatus::Running,
            Self::SUCCEEDED => TicketStatus::Succeeded,
            Self::ERROR => TicketStatus::Error,
            other => TicketStatus::Unknown(other),
        }
    }
}

impl From<TicketStatus> for u32 {
    fn from(status: TicketStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Kubernetes operation status codes, folded onto [`TicketStatus`]
pub mod operation_status {
    use super::TicketStatus;

    pub const PENDING: u32 = 0;
    pub const RUNNING: u32 = 1;
    pub const DONE: u32 = 2;
    pub const FAILED: u32 = 3;

    pub fn to_ticket_status(code: u32) -> TicketStatus {
        match code {
            PENDING => TicketStatus::New,
            RUNNING => TicketStatus::Running,
            DONE => TicketStatus::Succeeded,
            FAILED => TicketStatus::Error,
            other => TicketStatus::Unknown(other),
        }
    }
}

/// Power/lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum InstanceState {
    Provisioning,
    Running,
    Stopped,
    Error,
    Unknown(u32),
}

impl InstanceState {
    pub fn code(self) -> u32 {
        match self {
            InstanceState::Provisioning => 1,
            InstanceState::Running => 2,
            InstanceState::Stopped => 3,
            InstanceState::Error => 4,
            InstanceState::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InstanceState::Provisioning => "provisioning",
            InstanceState::Running => "running",
            InstanceState::Stopped => "stopped",
            InstanceState::Error => "error",
            InstanceState::Unknown(_) => "unknown",
        }
    }
}

impl From<u32> for InstanceState {
    fn from(code: u32) -> Self {
        match code {
            1 => InstanceState::Provisioning,
            2 => InstanceState::Running,
            3 => InstanceState::Stopped,
            4 => InstanceState::Error,
            other => InstanceState::Unknown(other),
        }
    }
}

impl From<InstanceState> for u32 {
    fn from(state: InstanceState) -> Self {
        state.code()
    }
}

/// Error returned when a configured dictionary name does not exist
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("'{value}' is not a valid {dictionary}, expected one of: {expected}")]
pub struct UnknownName {
    pub dictionary: &'static str,
    pub value: String,
    pub expected: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DiskType {
    Hdd,
    Ssd,
    Nvme,
}

impl DiskType {
    pub const ALL: [DiskType; 3] = [DiskType::Hdd, DiskType::Ssd, DiskType::Nvme];

    pub fn code(self) -> u32 {
        match self {
            DiskType::Hdd => 1,
            DiskType::Ssd => 2,
            DiskType::Nvme => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DiskType::Hdd => "hdd",
            DiskType::Ssd => "ssd",
            DiskType::Nvme => "nvme",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, UnknownName> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| unknown_name("disk type", name, Self::ALL.map(Self::name)))
    }
}

impl TryFrom<u32> for DiskType {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| format!("unknown disk type code {}", code))
    }
}

impl From<DiskType> for u32 {
    fn from(t: DiskType) -> Self {
        t.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum LbAlgorithm {
    RoundRobin,
    LeastConnections,
    SourceIp,
}

impl LbAlgorithm {
    pub const ALL: [LbAlgorithm; 3] = [
        LbAlgorithm::RoundRobin,
        LbAlgorithm::LeastConnections,
        LbAlgorithm::SourceIp,
    ];

    pub fn code(self) -> u32 {
        match self {
            LbAlgorithm::RoundRobin => 1,
            LbAlgorithm::LeastConnections => 2,
            LbAlgorithm::SourceIp => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LbAlgorithm::RoundRobin => "round_robin",
            LbAlgorithm::LeastConnections => "least_connections",
            LbAlgorithm::SourceIp => "source_ip",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, UnknownName> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| {
                unknown_name("load balancer algorithm", name, Self::ALL.map(Self::name))
            })
    }
}

impl TryFrom<u32> for LbAlgorithm {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|a| a.code() == code)
            .ok_or_else(|| format!("unknown load balancer algorithm code {}", code))
    }
}

impl From<LbAlgorithm> for u32 {
    fn from(a: LbAlgorithm) -> Self {
        a.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub const ALL: [IpVersion; 2] = [IpVersion::V4, IpVersion::V6];

    pub fn code(self) -> u32 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IpVersion::V4 => "ipv4",
            IpVersion::V6 => "ipv6",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, UnknownName> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == name)
            .ok_or_else(|| unknown_name("IP version", name, Self::ALL.map(Self::name)))
    }
}

impl TryFrom<u32> for IpVersion {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|v| v.code() == code)
            .ok_or_else(|| format!("unknown IP version code {}", code))
    }
}

impl From<IpVersion> for u32 {
    fn from(v: IpVersion) -> Self {
        v.code()
    }
}

fn unknown_name<const N: usize>(
    dictionary: &'static str,
    value: &str,
    names: [&'static str; N],
) -> UnknownName {
    UnknownName {
        dictionary,
        value: value.to_string(),
        expected: names.join(", "),
    }
}
