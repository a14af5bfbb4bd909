//! `ClusterProvision`: a single provisioning attempt of a cluster deployment

use serde::{Deserialize, Serialize};

use k8sform_core::{Attribute, Validator, attributes};
use k8sform_kube::CustomResourceType;

use crate::common::{LocalObjectReference, local_object_reference};
use crate::{GROUP, VERSION};

pub const STAGES: [&str; 4] = ["Initializing", "Provisioning", "Complete", "Failed"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProvisionSpec {
    #[serde(default)]
    pub cluster_deployment_ref: LocalObjectReference,

    /// Name of the pod running the install
    #[serde(default)]
    pub pod_name: String,

    #[serde(default)]
    pub stage: String,

    /// Attempt number, starting at 0
    #[serde(default)]
    pub attempt: i64,

    #[serde(rename = "clusterID", skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    #[serde(rename = "infraID", skip_serializing_if = "Option::is_none")]
    pub infra_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_kubeconfig_secret_ref: Option<LocalObjectReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password_secret_ref: Option<LocalObjectReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_log: Option<String>,

    /// Base64-encoded cluster metadata
    #[serde(rename = "metadataJSON", skip_serializing_if = "Option::is_none")]
    pub metadata_json: Option<String>,

    #[serde(rename = "prevClusterID", skip_serializing_if = "Option::is_none")]
    pub prev_cluster_id: Option<String>,

    #[serde(rename = "prevInfraID", skip_serializing_if = "Option::is_none")]
    pub prev_infra_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_provision_name: Option<String>,
}

pub struct ClusterProvision;

impl CustomResourceType for ClusterProvision {
    type Spec = ClusterProvisionSpec;
    const GROUP: &'static str = GROUP;
    const VERSION: &'static str = VERSION;
    const KIND: &'static str = "ClusterProvision";
    const PLURAL: &'static str = "clusterprovisions";

    fn spec_attribute() -> Attribute {
        Attribute::required_object(attributes([
            (
                "cluster_deployment_ref",
                local_object_reference()
                    .required()
                    .with_description("ClusterDeployment this provision belongs to"),
            ),
            (
                "pod_name",
                Attribute::required_string()
                    .with_description("Name of the pod running the install")
                    .with_validator(Validator::not_empty()),
            ),
            (
                "stage",
                Attribute::required_string()
                    .with_description("Stage of the provision")
                    .with_validator(Validator::one_of(STAGES)),
            ),
            (
                "attempt",
                Attribute::required_int64()
                    .with_description("Provision attempt number")
                    .with_validator(Validator::AtLeast(0)),
            ),
            (
                "cluster_id",
                Attribute::optional_string()
                    .wire("clusterID")
                    .with_description("Unique ID of the cluster, set once known"),
            ),
            (
                "infra_id",
                Attribute::optional_string()
                    .wire("infraID")
                    .with_description("Infrastructure ID used to tag cloud resources"),
            ),
            (
                "admin_kubeconfig_secret_ref",
                local_object_reference()
                    .with_description("Secret holding the admin kubeconfig"),
            ),
            (
                "admin_password_secret_ref",
                local_object_reference()
                    .with_description("Secret holding the admin username and password"),
            ),
            (
                "install_log",
                Attribute::optional_string().with_description("Install log output"),
            ),
            (
                "metadata_json",
                Attribute::optional_string()
                    .wire("metadataJSON")
                    .sensitive()
                    .with_description("Base64-encoded cluster metadata")
                    .with_validator(Validator::Base64),
            ),
            (
                "prev_cluster_id",
                Attribute::optional_string()
                    .wire("prevClusterID")
                    .with_description("Cluster ID of the previous failed attempt"),
            ),
            (
                "prev_infra_id",
                Attribute::optional_string()
                    .wire("prevInfraID")
                    .with_description("Infrastructure ID of the previous failed attempt"),
            ),
            (
                "prev_provision_name",
                Attribute::optional_string()
                    .with_description("Name of the previous failed provision"),
            ),
        ]))
        .with_description("Desired state of the ClusterProvision")
    }
}
