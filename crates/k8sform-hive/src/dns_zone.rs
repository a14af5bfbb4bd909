//! `DNSZone`: a DNS zone managed by Hive in a cloud provider

use serde::{Deserialize, Serialize};

use k8sform_core::{Attribute, Validator, attributes};
use k8sform_kube::CustomResourceType;

use crate::common::{LocalObjectReference, credentials_secret_ref, local_object_reference};
use crate::{GROUP, VERSION};

pub const AZURE_CLOUD_NAMES: [&str; 4] = [
    "AzurePublicCloud",
    "AzureUSGovernmentCloud",
    "AzureChinaCloud",
    "AzureGermanCloud",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsZoneSpec {
    #[serde(default)]
    pub zone: String,

    /// Create NS records in the parent zone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_to_parent_domain: Option<bool>,

    /// Keep the cloud zone when the object is deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_on_delete: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsDnsZoneSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpDnsZoneSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureDnsZoneSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsDnsZoneSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_secret_ref: Option<LocalObjectReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_assume_role: Option<AwsAssumeRole>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_tags: Option<Vec<AwsResourceTag>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsAssumeRole {
    #[serde(rename = "roleARN", default)]
    pub role_arn: String,

    #[serde(rename = "externalID", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsResourceTag {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpDnsZoneSpec {
    #[serde(default)]
    pub credentials_secret_ref: LocalObjectReference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureDnsZoneSpec {
    #[serde(default)]
    pub credentials_secret_ref: LocalObjectReference,

    #[serde(default)]
    pub resource_group_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<String>,
}

pub struct DnsZone;

impl CustomResourceType for DnsZone {
    type Spec = DnsZoneSpec;
    const GROUP: &'static str = GROUP;
    const VERSION: &'static str = VERSION;
    const KIND: &'static str = "DNSZone";
    const PLURAL: &'static str = "dnszones";

    fn spec_attribute() -> Attribute {
        Attribute::required_object(attributes([
            (
                "zone",
                Attribute::required_string()
                    .with_description("DNS zone to host")
                    .with_validator(Validator::not_empty()),
            ),
            (
                "link_to_parent_domain",
                Attribute::optional_bool()
                    .with_description("Create NS records for the zone in its parent zone"),
            ),
            (
                "preserve_on_delete",
                Attribute::optional_bool()
                    .with_description("Keep the cloud DNS zone when the DNSZone is deleted"),
            ),
            ("aws", aws_attribute()),
            (
                "gcp",
                Attribute::optional_object(attributes([(
                    "credentials_secret_ref",
                    credentials_secret_ref(),
                )]))
                .with_description("GCP Cloud DNS settings"),
            ),
            (
                "azure",
                Attribute::optional_object(attributes([
                    ("credentials_secret_ref", credentials_secret_ref()),
                    (
                        "resource_group_name",
                        Attribute::required_string()
                            .with_description("Resource group holding the zone")
                            .with_validator(Validator::not_empty()),
                    ),
                    (
                        "cloud_name",
                        Attribute::optional_string()
                            .with_description("Azure cloud environment")
                            .with_validator(Validator::one_of(AZURE_CLOUD_NAMES)),
                    ),
                ]))
                .with_description("Azure DNS settings"),
            ),
        ]))
        .with_description("Desired state of the DNSZone")
    }
}

fn aws_attribute() -> Attribute {
    Attribute::optional_object(attributes([
        (
            "credentials_secret_ref",
            local_object_reference().with_description("Secret holding the AWS credentials"),
        ),
        (
            "credentials_assume_role",
            Attribute::optional_object(attributes([
                (
                    "role_arn",
                    Attribute::required_string()
                        .wire("roleARN")
                        .with_description("ARN of the role to assume")
                        .with_validator(Validator::matches(
                            r"^arn:aws[a-z-]*:iam::[0-9]{12}:role/.+$",
                            "value must be an IAM role ARN",
                        )),
                ),
                (
                    "external_id",
                    Attribute::optional_string()
                        .wire("externalID")
                        .sensitive()
                        .with_description("External ID required by the role trust policy"),
                ),
            ]))
            .with_description("Role to assume instead of static credentials"),
        ),
        (
            "additional_tags",
            Attribute::optional_object_list(attributes([
                (
                    "key",
                    Attribute::required_string().with_validator(Validator::not_empty()),
                ),
                (
                    "value",
                    Attribute::required_string().with_validator(Validator::not_empty()),
                ),
            ]))
            .with_description("Tags applied to the hosted zone"),
        ),
        (
            "region",
            Attribute::optional_string().with_description("AWS region of the hosted zone"),
        ),
    ]))
    .with_description("AWS Route53 settings")
}
