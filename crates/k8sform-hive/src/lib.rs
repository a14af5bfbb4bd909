//! k8sform Hive - Hive (`hive.openshift.io/v1`) custom resources
//!
//! Each type only declares its typed spec and schema; the lifecycle comes from
//! `k8sform_kube::Resource` and `k8sform_kube::ManifestDataSource`.

pub mod cluster_provision;
pub mod common;
pub mod dns_zone;
pub mod machine_pool;
pub mod registry;

pub const GROUP: &str = "hive.openshift.io";
pub const VERSION: &str = "v1";

pub use cluster_provision::{ClusterProvision, ClusterProvisionSpec};
pub use common::LocalObjectReference;
pub use dns_zone::{DnsZone, DnsZoneSpec};
pub use machine_pool::{MachinePool, MachinePoolSpec};
pub use registry::{RegisteredType, data_sources, resources};
