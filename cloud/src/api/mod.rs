//! Clients for the compute and managed Kubernetes APIs

pub mod client;
pub mod common;
pub mod dictionary;
pub mod error;

pub mod disks;
pub mod floating_ips;
pub mod groups;
pub mod images;
pub mod instances;
pub mod kubernetes;
pub mod load_balancers;
pub mod networks;
pub mod ssh_keys;
pub mod tickets;

pub use client::{Client, RetryConfig};
pub use error::ApiError;
pub use tickets::Ticket;
