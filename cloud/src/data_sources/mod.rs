//! Data sources
//!
//! Every data source is built from a generic engine in [`list`] and a
//! per-object adapter in [`compute`] or [`kubernetes`].

pub mod compute;
pub mod filter;
pub mod kubernetes;
pub mod list;

pub use filter::{FieldKind, FilterClause, Record, RecordField};
pub use list::{ListDataSource, ListSource, LookupDataSource, LookupSource, RecordMapper};

use tfplug::DataSourceWithConfigure;

pub fn instances() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(compute::Instances))
}

pub fn instance() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(compute::Instances))
}

pub fn disks() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(compute::Disks))
}

pub fn disk() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(compute::Disks))
}

pub fn networks() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(compute::Networks))
}

pub fn network() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(compute::Networks))
}

pub fn floating_ips() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(compute::FloatingIps))
}

pub fn floating_ip() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(compute::FloatingIps))
}

pub fn groups() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(compute::Groups))
}

pub fn group() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(compute::Groups))
}

pub fn load_balancers() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(compute::LoadBalancers))
}

pub fn load_balancer() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(compute::LoadBalancers))
}

pub fn ssh_keys() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(compute::SshKeys))
}

pub fn ssh_key() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(compute::SshKeys))
}

pub fn images() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(compute::Images))
}

pub fn image() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(compute::Images))
}

pub fn kubernetes_clusters() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(kubernetes::Clusters))
}

pub fn kubernetes_cluster() -> Box<dyn DataSourceWithConfigure> {
    Box::new(LookupDataSource::new(kubernetes::Clusters))
}

pub fn kubernetes_nodes() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ListDataSource::new(kubernetes::Nodes))
}
