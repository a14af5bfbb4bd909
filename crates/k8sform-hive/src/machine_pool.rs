//! `MachinePool`: worker machines of a cluster deployment

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use k8sform_core::{Attribute, AttributePath, ValidationFailure, Validator, attributes};
use k8sform_kube::CustomResourceType;

use crate::common::{LocalObjectReference, local_object_reference};
use crate::{GROUP, VERSION};

pub const TAINT_EFFECTS: [&str; 3] = ["NoSchedule", "PreferNoSchedule", "NoExecute"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolSpec {
    #[serde(default)]
    pub cluster_deployment_ref: LocalObjectReference,

    /// Pool name, also used in the names of the machine sets
    #[serde(default)]
    pub name: String,

    /// Fixed size; mutually exclusive with `autoscaling`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<MachinePoolAutoscaling>,

    /// Labels applied to the nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// Labels applied to the Machine objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_labels: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub taints: Option<Vec<Taint>>,

    #[serde(default)]
    pub platform: MachinePoolPlatform,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolAutoscaling {
    #[serde(default)]
    pub min_replicas: i64,
    #[serde(default)]
    pub max_replicas: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    #[serde(default)]
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub effect: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePoolPlatform {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsMachinePoolPlatform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpMachinePoolPlatform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureMachinePoolPlatform>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachinePoolPlatform {
    #[serde(rename = "type", default)]
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<AwsRootVolume>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsRootVolume {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
    #[serde(default)]
    pub size: i64,
    #[serde(rename = "type", default)]
    pub volume_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpMachinePoolPlatform {
    #[serde(rename = "type", default)]
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMachinePoolPlatform {
    #[serde(rename = "type", default)]
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_disk: Option<AzureOsDisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureOsDisk {
    #[serde(rename = "diskSizeGB", default)]
    pub disk_size_gb: i64,
}

pub struct MachinePool;

impl CustomResourceType for MachinePool {
    type Spec = MachinePoolSpec;
    const GROUP: &'static str = GROUP;
    const VERSION: &'static str = VERSION;
    const KIND: &'static str = "MachinePool";
    const PLURAL: &'static str = "machinepools";

    fn spec_attribute() -> Attribute {
        Attribute::required_object(attributes([
            (
                "cluster_deployment_ref",
                local_object_reference()
                    .required()
                    .with_description("ClusterDeployment the pool belongs to"),
            ),
            (
                "name",
                Attribute::required_string()
                    .with_description("Name of the pool")
                    .with_validator(Validator::not_empty()),
            ),
            (
                "replicas",
                Attribute::optional_int64()
                    .with_description("Number of machines; mutually exclusive with autoscaling")
                    .with_validator(Validator::AtLeast(0)),
            ),
            (
                "autoscaling",
                Attribute::optional_object(attributes([
                    (
                        "min_replicas",
                        Attribute::required_int64().with_validator(Validator::AtLeast(0)),
                    ),
                    (
                        "max_replicas",
                        Attribute::required_int64().with_validator(Validator::AtLeast(1)),
                    ),
                ]))
                .with_description("Autoscaling bounds"),
            ),
            (
                "labels",
                Attribute::optional_string_map().with_description("Labels applied to the nodes"),
            ),
            (
                "machine_labels",
                Attribute::optional_string_map()
                    .with_description("Labels applied to the Machine objects"),
            ),
            (
                "taints",
                Attribute::optional_object_list(attributes([
                    (
                        "key",
                        Attribute::required_string().with_validator(Validator::not_empty()),
                    ),
                    ("value", Attribute::optional_string()),
                    (
                        "effect",
                        Attribute::required_string()
                            .with_validator(Validator::one_of(TAINT_EFFECTS)),
                    ),
                ]))
                .with_description("Taints applied to the nodes"),
            ),
            ("platform", platform_attribute()),
        ]))
        .with_description("Desired state of the MachinePool")
    }

    fn validate_spec(spec: &MachinePoolSpec) -> Vec<ValidationFailure> {
        if spec.replicas.is_some() && spec.autoscaling.is_some() {
            return vec![ValidationFailure {
                path: AttributePath::attribute("spec").with_attribute("replicas"),
                constraint: "conflicts with spec.autoscaling".to_string(),
                message: "set either replicas or autoscaling, not both".to_string(),
            }];
        }
        Vec::new()
    }
}

fn zones() -> Attribute {
    Attribute::optional_string_list().with_description("Availability zones")
}

fn platform_attribute() -> Attribute {
    Attribute::required_object(attributes([
        (
            "aws",
            Attribute::optional_object(attributes([
                (
                    "instance_type",
                    Attribute::required_string()
                        .wire("type")
                        .with_description("EC2 instance type")
                        .with_validator(Validator::not_empty()),
                ),
                (
                    "root_volume",
                    Attribute::optional_object(attributes([
                        ("iops", Attribute::optional_int64().with_validator(Validator::AtLeast(0))),
                        (
                            "size",
                            Attribute::required_int64()
                                .with_description("Size in GiB")
                                .with_validator(Validator::AtLeast(1)),
                        ),
                        (
                            "volume_type",
                            Attribute::required_string()
                                .wire("type")
                                .with_validator(Validator::not_empty()),
                        ),
                    ])),
                ),
                ("zones", zones()),
                (
                    "subnets",
                    Attribute::optional_string_list().with_description("Subnet IDs for the machines"),
                ),
            ])),
        ),
        (
            "gcp",
            Attribute::optional_object(attributes([
                (
                    "instance_type",
                    Attribute::required_string()
                        .wire("type")
                        .with_description("Machine type")
                        .with_validator(Validator::not_empty()),
                ),
                ("zones", zones()),
            ])),
        ),
        (
            "azure",
            Attribute::optional_object(attributes([
                (
                    "instance_type",
                    Attribute::required_string()
                        .wire("type")
                        .with_description("VM size")
                        .with_validator(Validator::not_empty()),
                ),
                (
                    "os_disk",
                    Attribute::optional_object(attributes([(
                        "disk_size_gb",
                        Attribute::required_int64()
                            .wire("diskSizeGB")
                            .with_validator(Validator::AtLeast(1)),
                    )])),
                ),
                ("zones", zones()),
            ])),
        ),
    ]))
    .with_description("Cloud platform of the machines")
}
