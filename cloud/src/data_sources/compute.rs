//! Record adapters for compute API objects
//!
//! Each type here backs one list data source (`cloud_<plural>`) and one
//! lookup data source (`cloud_<singular>`).

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::types::{Dynamic, DynamicValue};

use super::filter::{Record, RecordField};
use super::list::{ListSource, LookupSource, RecordMapper};
use crate::api::disks::Disk;
use crate::api::floating_ips::FloatingIp;
use crate::api::groups::Group;
use crate::api::images::Image;
use crate::api::instances::Instance;
use crate::api::load_balancers::LoadBalancer;
use crate::api::networks::Network;
use crate::api::ssh_keys::SshKey;
use crate::error::{Error, Result};
use crate::provider_data::CloudProviderData;
use crate::values::{id_list, id_value, optional_id, parse_id, timestamp};

pub(crate) fn record_of<const N: usize>(pairs: [(&str, Dynamic); N]) -> Record {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub struct Instances;

impl RecordMapper for Instances {
    type Item = Instance;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Instance identifier"),
            RecordField::string("name", "Instance name"),
            RecordField::string("image_id", "Image the instance was built from"),
            RecordField::string("image_name", "Name of that image"),
            RecordField::int("cpu", "Number of vCPUs"),
            RecordField::int("ram", "Memory in MiB"),
            RecordField::string("group_id", "Group the instance belongs to"),
            RecordField::string_list("ssh_key_ids", "SSH keys installed at creation"),
            RecordField::string_list("floating_ip_ids", "Attached floating IPs"),
            RecordField::string_list("network_ids", "Attached private networks"),
            RecordField::string_list("disk_ids", "Attached disks"),
            RecordField::string("state", "Lifecycle state"),
            RecordField::string("ipv4", "Primary IPv4 address"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &Instance) -> Result<Record> {
        let image = item
            .image
            .as_ref()
            .ok_or_else(|| Error::mapping(format!("instance {}", item.id), "image is missing"))?;

        Ok(record_of([
            ("id", id_value(item.id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("image_id", id_value(image.id)),
            ("image_name", Dynamic::from(image.name.as_str())),
            ("cpu", Dynamic::from(item.cpu)),
            ("ram", Dynamic::from(item.ram)),
            ("group_id", optional_id(item.group_id)),
            ("ssh_key_ids", id_list(&item.ssh_key_ids)),
            ("floating_ip_ids", id_list(&item.floating_ip_ids)),
            ("network_ids", id_list(&item.network_ids)),
            ("disk_ids", id_list(&item.disk_ids)),
            ("state", Dynamic::from(item.state.name())),
            ("ipv4", Dynamic::from(item.ipv4.clone())),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for Instances {
    fn type_name(&self) -> &'static str {
        "cloud_instances"
    }

    fn collection(&self) -> &'static str {
        "instances"
    }

    fn description(&self) -> &'static str {
        "Lists virtual instances"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<Instance>> {
        data.compute
            .instances()
            .list()
            .await
            .map_err(|e| Error::api("listing instances", e))
    }
}

#[async_trait]
impl LookupSource for Instances {
    fn type_name(&self) -> &'static str {
        "cloud_instance"
    }

    fn description(&self) -> &'static str {
        "Looks up a virtual instance by id"
    }

    async fn fetch_one(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        id: &str,
    ) -> Result<Instance> {
        let id = parse_id("id", id)?;
        data.compute
            .instances()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading instance {}", id), e))
    }
}

pub struct Disks;

impl RecordMapper for Disks {
    type Item = Disk;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Disk identifier"),
            RecordField::string("name", "Disk name"),
            RecordField::int("size", "Size in GiB"),
            RecordField::string("disk_type", "Storage class (hdd, ssd, nvme)"),
            RecordField::string("instance_id", "Instance the disk is attached to"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &Disk) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("size", Dynamic::from(item.size)),
            ("disk_type", Dynamic::from(item.disk_type.name())),
            ("instance_id", optional_id(item.instance_id)),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for Disks {
    fn type_name(&self) -> &'static str {
        "cloud_disks"
    }

    fn collection(&self) -> &'static str {
        "disks"
    }

    fn description(&self) -> &'static str {
        "Lists disks"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<Disk>> {
        data.compute
            .disks()
            .list()
            .await
            .map_err(|e| Error::api("listing disks", e))
    }
}

#[async_trait]
impl LookupSource for Disks {
    fn type_name(&self) -> &'static str {
        "cloud_disk"
    }

    fn description(&self) -> &'static str {
        "Looks up a disk by id"
    }

    async fn fetch_one(&self, _ctx: &Context, data: &CloudProviderData, id: &str) -> Result<Disk> {
        let id = parse_id("id", id)?;
        data.compute
            .disks()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading disk {}", id), e))
    }
}

pub struct Networks;

impl RecordMapper for Networks {
    type Item = Network;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Network identifier"),
            RecordField::string("name", "Network name"),
            RecordField::string("cidr", "Address range"),
            RecordField::string("description", "Free-form description"),
            RecordField::string("gateway", "Gateway address"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &Network) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("cidr", Dynamic::from(item.cidr.as_str())),
            ("description", Dynamic::from(item.description.clone())),
            ("gateway", Dynamic::from(item.gateway.clone())),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for Networks {
    fn type_name(&self) -> &'static str {
        "cloud_networks"
    }

    fn collection(&self) -> &'static str {
        "networks"
    }

    fn description(&self) -> &'static str {
        "Lists private networks"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<Network>> {
        data.compute
            .networks()
            .list()
            .await
            .map_err(|e| Error::api("listing networks", e))
    }
}

#[async_trait]
impl LookupSource for Networks {
    fn type_name(&self) -> &'static str {
        "cloud_network"
    }

    fn description(&self) -> &'static str {
        "Looks up a private network by id"
    }

    async fn fetch_one(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        id: &str,
    ) -> Result<Network> {
        let id = parse_id("id", id)?;
        data.compute
            .networks()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading network {}", id), e))
    }
}

pub struct FloatingIps;

impl RecordMapper for FloatingIps {
    type Item = FloatingIp;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Floating IP identifier"),
            RecordField::string("address", "The public address"),
            RecordField::string("ip_version", "ipv4 or ipv6"),
            RecordField::string("description", "Free-form description"),
            RecordField::string("instance_id", "Instance the address is attached to"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &FloatingIp) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("address", Dynamic::from(item.address.as_str())),
            ("ip_version", Dynamic::from(item.ip_version.name())),
            ("description", Dynamic::from(item.description.clone())),
            ("instance_id", optional_id(item.instance_id)),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for FloatingIps {
    fn type_name(&self) -> &'static str {
        "cloud_floating_ips"
    }

    fn collection(&self) -> &'static str {
        "floating_ips"
    }

    fn description(&self) -> &'static str {
        "Lists floating IPs"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<FloatingIp>> {
        data.compute
            .floating_ips()
            .list()
            .await
            .map_err(|e| Error::api("listing floating IPs", e))
    }
}

#[async_trait]
impl LookupSource for FloatingIps {
    fn type_name(&self) -> &'static str {
        "cloud_floating_ip"
    }

    fn description(&self) -> &'static str {
        "Looks up a floating IP by id"
    }

    async fn fetch_one(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        id: &str,
    ) -> Result<FloatingIp> {
        let id = parse_id("id", id)?;
        data.compute
            .floating_ips()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading floating IP {}", id), e))
    }
}

pub struct Groups;

impl RecordMapper for Groups {
    type Item = Group;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Group identifier"),
            RecordField::string("name", "Group name"),
            RecordField::string("description", "Free-form description"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &Group) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("description", Dynamic::from(item.description.clone())),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for Groups {
    fn type_name(&self) -> &'static str {
        "cloud_groups"
    }

    fn collection(&self) -> &'static str {
        "groups"
    }

    fn description(&self) -> &'static str {
        "Lists instance groups"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<Group>> {
        data.compute
            .groups()
            .list()
            .await
            .map_err(|e| Error::api("listing groups", e))
    }
}

#[async_trait]
impl LookupSource for Groups {
    fn type_name(&self) -> &'static str {
        "cloud_group"
    }

    fn description(&self) -> &'static str {
        "Looks up an instance group by id"
    }

    async fn fetch_one(&self, _ctx: &Context, data: &CloudProviderData, id: &str) -> Result<Group> {
        let id = parse_id("id", id)?;
        data.compute
            .groups()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading group {}", id), e))
    }
}

pub struct LoadBalancers;

impl RecordMapper for LoadBalancers {
    type Item = LoadBalancer;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Load balancer identifier"),
            RecordField::string("name", "Load balancer name"),
            RecordField::string("algorithm", "Balancing algorithm"),
            RecordField::string("network_id", "Network the balancer lives in"),
            RecordField::int("port", "Listening port"),
            RecordField::int("target_port", "Port traffic is forwarded to"),
            RecordField::string_list("instance_ids", "Member instances"),
            RecordField::string("address", "Frontend address"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &LoadBalancer) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("algorithm", Dynamic::from(item.algorithm.name())),
            ("network_id", id_value(item.network_id)),
            ("port", Dynamic::from(u32::from(item.port))),
            ("target_port", Dynamic::from(u32::from(item.target_port))),
            ("instance_ids", id_list(&item.member_ids)),
            ("address", Dynamic::from(item.address.clone())),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for LoadBalancers {
    fn type_name(&self) -> &'static str {
        "cloud_load_balancers"
    }

    fn collection(&self) -> &'static str {
        "load_balancers"
    }

    fn description(&self) -> &'static str {
        "Lists load balancers"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<LoadBalancer>> {
        data.compute
            .load_balancers()
            .list()
            .await
            .map_err(|e| Error::api("listing load balancers", e))
    }
}

#[async_trait]
impl LookupSource for LoadBalancers {
    fn type_name(&self) -> &'static str {
        "cloud_load_balancer"
    }

    fn description(&self) -> &'static str {
        "Looks up a load balancer by id"
    }

    async fn fetch_one(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        id: &str,
    ) -> Result<LoadBalancer> {
        let id = parse_id("id", id)?;
        data.compute
            .load_balancers()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading load balancer {}", id), e))
    }
}

pub struct SshKeys;

impl RecordMapper for SshKeys {
    type Item = SshKey;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "SSH key identifier"),
            RecordField::string("name", "Key name"),
            RecordField::string("public_key", "OpenSSH public key"),
            RecordField::string("fingerprint", "Key fingerprint"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &SshKey) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("public_key", Dynamic::from(item.public_key.as_str())),
            ("fingerprint", Dynamic::from(item.fingerprint.clone())),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for SshKeys {
    fn type_name(&self) -> &'static str {
        "cloud_ssh_keys"
    }

    fn collection(&self) -> &'static str {
        "ssh_keys"
    }

    fn description(&self) -> &'static str {
        "Lists SSH keys"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<SshKey>> {
        data.compute
            .ssh_keys()
            .list()
            .await
            .map_err(|e| Error::api("listing SSH keys", e))
    }
}

#[async_trait]
impl LookupSource for SshKeys {
    fn type_name(&self) -> &'static str {
        "cloud_ssh_key"
    }

    fn description(&self) -> &'static str {
        "Looks up an SSH key by id"
    }

    async fn fetch_one(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        id: &str,
    ) -> Result<SshKey> {
        let id = parse_id("id", id)?;
        data.compute
            .ssh_keys()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading SSH key {}", id), e))
    }
}

pub struct Images;

impl RecordMapper for Images {
    type Item = Image;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Image identifier"),
            RecordField::string("name", "Image name"),
            RecordField::string("os", "Operating system family"),
            RecordField::string("version", "Operating system version"),
            RecordField::float("size", "Image size in GiB"),
            RecordField::int("min_disk", "Smallest bootable disk in GiB"),
            RecordField::bool("public", "Whether the image is shared publicly"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &Image) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("os", Dynamic::from(item.os.as_str())),
            ("version", Dynamic::from(item.version.clone())),
            ("size", Dynamic::from(item.size)),
            ("min_disk", Dynamic::from(item.min_disk)),
            ("public", Dynamic::from(item.public)),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for Images {
    fn type_name(&self) -> &'static str {
        "cloud_images"
    }

    fn collection(&self) -> &'static str {
        "images"
    }

    fn description(&self) -> &'static str {
        "Lists images available for new instances"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<Image>> {
        data.compute
            .images()
            .list()
            .await
            .map_err(|e| Error::api("listing images", e))
    }
}

#[async_trait]
impl LookupSource for Images {
    fn type_name(&self) -> &'static str {
        "cloud_image"
    }

    fn description(&self) -> &'static str {
        "Looks up an image by id"
    }

    async fn fetch_one(&self, _ctx: &Context, data: &CloudProviderData, id: &str) -> Result<Image> {
        let id = parse_id("id", id)?;
        data.compute
            .images()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading image {}", id), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dictionary::InstanceState;

    fn instance(image: bool) -> Instance {
        serde_json::from_value(serde_json::json!({
            "id": 5,
            "name": "web",
            "image": if image { serde_json::json!({"id": 7, "name": "debian-12"}) } else { serde_json::Value::Null },
            "cpu": 2,
            "ram": 2048,
            "network_ids": [1, 2],
            "state": InstanceState::Running.code()
        }))
        .unwrap()
    }

    #[test]
    fn instance_record_uses_string_ids() {
        let record = Instances.to_record(&instance(true)).unwrap();

        assert_eq!(record["id"], Dynamic::from("5"));
        assert_eq!(record["image_id"], Dynamic::from("7"));
        assert_eq!(record["cpu"], Dynamic::Number(2.0));
        assert_eq!(record["group_id"], Dynamic::Null);
        assert_eq!(
            record["network_ids"],
            Dynamic::List(vec![Dynamic::from("1"), Dynamic::from("2")])
        );
        assert_eq!(record["state"], Dynamic::from("running"));
    }

    #[test]
    fn instance_without_image_cannot_be_mapped() {
        let err = Instances.to_record(&instance(false)).unwrap_err();
        assert!(matches!(err, Error::Mapping { .. }));
    }

    #[test]
    fn every_mapped_field_is_declared() {
        let record = Instances.to_record(&instance(true)).unwrap();
        let fields = Instances.fields();

        for name in record.keys() {
            assert!(fields.iter().any(|f| f.name == name.as_str()), "{name} undeclared");
        }
        assert_eq!(record.len(), fields.len());
    }

    #[test]
    fn list_and_lookup_names_differ() {
        assert_eq!(ListSource::type_name(&Images), "cloud_images");
        assert_eq!(LookupSource::type_name(&Images), "cloud_image");
    }
}
