//! Every Hive resource and data source served by the provider

use k8sform_core::protocol::MetadataRequest;
use k8sform_core::{DataSourceService, ResourceService, Schema};
use k8sform_kube::{CustomResourceType, ManifestDataSource, PROVIDER_TYPE_NAME, Resource};

use crate::{ClusterProvision, DnsZone, MachinePool};

/// A registered type: its full type name and schema
#[derive(Debug, Clone)]
pub struct RegisteredType {
    pub type_name: String,
    pub kind: &'static str,
    pub schema: Schema,
}

fn request() -> MetadataRequest {
    MetadataRequest {
        provider_type_name: PROVIDER_TYPE_NAME.to_string(),
    }
}

fn resource<C: CustomResourceType>() -> RegisteredType {
    let resource = Resource::<C>::new();
    RegisteredType {
        type_name: resource.metadata(request()).type_name,
        kind: C::KIND,
        schema: resource.schema(),
    }
}

fn data_source<C: CustomResourceType>() -> RegisteredType {
    let data_source = ManifestDataSource::<C>::new();
    RegisteredType {
        type_name: data_source.metadata(request()).type_name,
        kind: C::KIND,
        schema: data_source.schema(),
    }
}

/// Managed resources (`k8s_hive_openshift_io_<kind>_v1`)
pub fn resources() -> Vec<RegisteredType> {
    vec![
        resource::<ClusterProvision>(),
        resource::<DnsZone>(),
        resource::<MachinePool>(),
    ]
}

/// Manifest data sources (`k8s_hive_openshift_io_<kind>_v1_manifest`)
pub fn data_sources() -> Vec<RegisteredType> {
    vec![
        data_source::<ClusterProvision>(),
        data_source::<DnsZone>(),
        data_source::<MachinePool>(),
    ]
}
