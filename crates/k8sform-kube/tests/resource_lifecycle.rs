//! Lifecycle tests for the generic resource adapter against the mock client

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use k8sform_core::protocol::{
    ConfigureRequest, CreateRequest, DeleteRequest, ImportStateRequest, MetadataRequest,
    ModifyPlanRequest, ReadRequest, UpdateRequest, ValidateConfigRequest,
};
use k8sform_core::{
    Attr, Attribute, ObjectMetadata, ResourceService, Validator, attributes,
};
use k8sform_kube::{
    ClientError, CustomResourceType, DeletionPropagation, MockDynamicClient, MockVerb,
    ProviderData, Resource, ResourceModel, WaitCondition,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GadgetSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

struct Gadget;

impl CustomResourceType for Gadget {
    type Spec = GadgetSpec;
    const GROUP: &'static str = "example.k8sform.dev";
    const VERSION: &'static str = "v1";
    const KIND: &'static str = "Gadget";
    const PLURAL: &'static str = "gadgets";

    fn spec_attribute() -> Attribute {
        Attribute::required_object(attributes([
            (
                "size",
                Attribute::optional_int64().with_validator(Validator::Between(1, 10)),
            ),
            (
                "color",
                Attribute::optional_string()
                    .computed()
                    .with_validator(Validator::one_of(["red", "blue"])),
            ),
        ]))
    }
}

fn gadget(namespace: &str, name: &str) -> ResourceModel<GadgetSpec> {
    ResourceModel::new(
        ObjectMetadata::new(namespace, name).with_label("team", "infra"),
        GadgetSpec {
            size: Some(3),
            color: None,
        },
    )
}

fn setup() -> (MockDynamicClient, Resource<Gadget>) {
    // The API server defaults the color
    let client = MockDynamicClient::new().with_defaulter(|obj| {
        if obj["spec"].get("color").is_none() {
            obj["spec"]["color"] = json!("red");
        }
    });
    let data = ProviderData::new(Arc::new(client.clone())).with_field_manager("provider-fm");
    (client, Resource::with_provider_data(data))
}

#[test]
fn test_metadata_type_name() {
    let resource = Resource::<Gadget>::new();
    let resp = resource.metadata(MetadataRequest {
        provider_type_name: "k8s".into(),
    });
    assert_eq!(resp.type_name, "k8s_example_k8sform_dev_gadget_v1");
}

#[tokio::test]
async fn test_create_then_read() {
    let (client, resource) = setup();

    let created = resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1"),
        })
        .await;
    assert!(!created.has_error(), "{:?}", created.diagnostics);
    let state = created.state.unwrap();
    assert_eq!(state.id, Attr::Known("ns1/g1".to_string()));
    // server-populated values flow back into state
    assert_eq!(state.spec.color.as_deref(), Some("red"));

    let stored = client.object(&Gadget::gvr(), "ns1", "g1").unwrap();
    assert_eq!(stored["apiVersion"], "example.k8sform.dev/v1");
    assert_eq!(stored["kind"], "Gadget");
    assert_eq!(stored["metadata"]["labels"]["team"], "infra");

    let read = resource.read(ReadRequest { state: state.clone() }).await;
    let read_state = read.state.unwrap();
    assert_eq!(read_state.metadata.name, state.metadata.name);
    assert_eq!(read_state.metadata.namespace, state.metadata.namespace);
    assert_eq!(read_state, state);
}

#[tokio::test]
async fn test_apply_params_resolution() {
    let (client, resource) = setup();

    resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1"),
        })
        .await;
    let params = client.last_apply_params().unwrap();
    assert_eq!(params.field_manager, "provider-fm");
    assert!(!params.force);

    let mut planned = gadget("ns1", "g1")
        .with_field_manager("resource-fm")
        .with_force_conflicts(true);
    planned.id = Attr::Unknown;
    resource.create(CreateRequest { planned_state: planned }).await;
    let params = client.last_apply_params().unwrap();
    assert_eq!(params.field_manager, "resource-fm");
    assert!(params.force);

    let mut planned = gadget("ns1", "g1");
    planned.field_manager = Attr::Unknown;
    planned.force_conflicts = Attr::Unknown;
    resource.create(CreateRequest { planned_state: planned }).await;
    let params = client.last_apply_params().unwrap();
    assert_eq!(params.field_manager, "provider-fm");
    assert!(!params.force);
}

#[tokio::test]
async fn test_update_keeps_prior_id() {
    let (_client, resource) = setup();
    let created = resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1"),
        })
        .await
        .state
        .unwrap();

    let mut planned = created.clone();
    planned.id = Attr::Unknown;
    planned.spec.size = Some(7);

    let updated = resource
        .update(UpdateRequest {
            prior_state: created.clone(),
            planned_state: planned,
        })
        .await
        .state
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.spec.size, Some(7));
}

#[tokio::test]
async fn test_validation_blocks_client_call() {
    let (client, resource) = setup();
    let mut planned = gadget("", "g1");
    planned.spec.size = Some(42);

    let resp = resource.create(CreateRequest { planned_state: planned }).await;
    assert!(resp.state.is_none());
    let paths: Vec<String> = resp
        .diagnostics
        .iter()
        .filter_map(|d| d.attribute.as_ref().map(ToString::to_string))
        .collect();
    assert!(paths.contains(&"metadata.namespace".to_string()), "{:?}", paths);
    assert!(paths.contains(&"spec.size".to_string()), "{:?}", paths);
    assert_eq!(client.operation_counts().total(), 0);
}

#[test]
fn test_validate_config_without_network() {
    let resource = Resource::<Gadget>::with_provider_data(ProviderData::offline());

    let ok = resource.validate_config(ValidateConfigRequest {
        config: gadget("ns1", "g1"),
    });
    assert!(ok.diagnostics.is_empty());

    let mut bad = gadget("ns1", "g1")
        .with_wait_for(WaitCondition::new(".status[*]"))
        .with_field_manager("");
    bad.spec.color = Some("green".into());
    let resp = resource.validate_config(ValidateConfigRequest { config: bad });
    let details: Vec<String> = resp.diagnostics.iter().map(|d| d.to_string()).collect();
    assert!(
        details.iter().any(|d| d.contains("spec.color") && d.contains("value must be one of: red, blue")),
        "{:?}",
        details
    );
    assert!(details.iter().any(|d| d.contains("field_manager")), "{:?}", details);
}

#[test]
fn test_invalid_wait_path_reported_by_validate_config() {
    let resource = Resource::<Gadget>::new();
    let resp = resource.validate_config(ValidateConfigRequest {
        config: gadget("ns1", "g1").with_wait_for(WaitCondition::new(".status[*]")),
    });
    let diag = resp.diagnostics.iter().next().unwrap();
    assert_eq!(diag.summary, "Invalid Wait Condition");
    assert_eq!(diag.attribute.as_ref().unwrap().to_string(), "wait_for");
}

#[tokio::test]
async fn test_offline_makes_no_calls() {
    let client = MockDynamicClient::new();
    let mut resource = Resource::<Gadget>::new();
    let mut data = ProviderData::new(Arc::new(client.clone()));
    data.offline = true;
    let resp = resource.configure(ConfigureRequest {
        provider_data: Some(Arc::new(data)),
    });
    assert!(resp.diagnostics.is_empty());

    let create = resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1"),
        })
        .await;
    let read = resource
        .read(ReadRequest {
            state: gadget("ns1", "g1"),
        })
        .await;
    let update = resource
        .update(UpdateRequest {
            prior_state: gadget("ns1", "g1"),
            planned_state: gadget("ns1", "g1"),
        })
        .await;
    let delete = resource
        .delete(DeleteRequest {
            state: gadget("ns1", "g1"),
        })
        .await;

    for diags in [&create.diagnostics, &read.diagnostics, &update.diagnostics, &delete.diagnostics] {
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Provider Configuration Error");
        assert!(diag.detail.contains("offline"), "{}", diag.detail);
    }
    assert!(create.state.is_none() && read.state.is_none() && update.state.is_none());
    assert_eq!(client.operation_counts().total(), 0);
}

#[tokio::test]
async fn test_unconfigured_resource_fails() {
    let resource = Resource::<Gadget>::new();
    let resp = resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1"),
        })
        .await;
    assert!(resp.has_error());
    assert!(resp.diagnostics.iter().next().unwrap().detail.contains("not been configured"));
}

#[test]
fn test_configure_rejects_foreign_data() {
    let mut resource = Resource::<Gadget>::new();
    assert!(resource.configure(ConfigureRequest::default()).diagnostics.is_empty());
    assert!(resource.provider_data().is_none());

    let resp = resource.configure(ConfigureRequest {
        provider_data: Some(Arc::new("not provider data".to_string())),
    });
    assert!(resp.diagnostics.has_error());
    let detail = &resp.diagnostics.iter().next().unwrap().detail;
    assert!(detail.contains("got an unexpected type"), "{detail}");
    assert!(!detail.contains("TypeId"));
    assert!(resource.provider_data().is_none());
}

#[tokio::test]
async fn test_read_not_found_removes_state() {
    let (_client, resource) = setup();
    let resp = resource
        .read(ReadRequest {
            state: gadget("ns1", "gone"),
        })
        .await;
    assert!(resp.state.is_none());
    assert!(resp.diagnostics.is_empty());
}

#[tokio::test]
async fn test_api_errors_name_the_verb() {
    let (client, resource) = setup();
    client.fail_next(
        MockVerb::Apply,
        ClientError::Status {
            code: 409,
            reason: "Conflict".into(),
            message: "Apply failed with 1 conflict".into(),
        },
    );
    let resp = resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1"),
        })
        .await;
    assert!(resp.state.is_none());
    assert_eq!(resp.diagnostics.iter().next().unwrap().summary, "Unable to PATCH resource");

    client.fail_next(MockVerb::Get, ClientError::Transport("connection refused".into()));
    let resp = resource
        .read(ReadRequest {
            state: gadget("ns1", "g1"),
        })
        .await;
    assert_eq!(resp.diagnostics.iter().next().unwrap().summary, "Unable to GET resource");

    let resp = resource
        .delete(DeleteRequest {
            state: gadget("ns1", "missing"),
        })
        .await;
    assert_eq!(resp.diagnostics.iter().next().unwrap().summary, "Unable to DELETE resource");
}

#[tokio::test]
async fn test_delete_passes_propagation() {
    let (client, resource) = setup();
    let state = resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1").with_deletion_propagation(DeletionPropagation::Foreground),
        })
        .await
        .state
        .unwrap();

    let resp = resource.delete(DeleteRequest { state }).await;
    assert!(resp.diagnostics.is_empty());
    assert_eq!(client.last_propagation(), Some(DeletionPropagation::Foreground));
    assert!(client.object(&Gadget::gvr(), "ns1", "g1").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_create_waits_for_conditions() {
    let (client, resource) = setup();
    client.status_after_gets("ns1", "g1", 1, json!({ "phase": "Ready" }));

    let resp = resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1")
                .with_wait_for(WaitCondition::new("{.status.phase}").with_value("Ready")),
        })
        .await;
    assert!(!resp.has_error(), "{:?}", resp.diagnostics);
    assert_eq!(client.operation_counts().gets, 2);
}

#[tokio::test(start_paused = true)]
async fn test_create_wait_timeout_writes_no_state() {
    let (_client, resource) = setup();
    let resp = resource
        .create(CreateRequest {
            planned_state: gadget("ns1", "g1").with_wait_for(
                WaitCondition::new("{.status.phase}")
                    .with_value("Ready")
                    .with_timeout(Duration::from_secs(3)),
            ),
        })
        .await;
    assert!(resp.state.is_none());
    let diag = resp.diagnostics.iter().next().unwrap();
    assert_eq!(diag.summary, "Wait Condition Not Met");
    assert!(diag.detail.contains("{.status.phase}"));
}

#[test]
fn test_import_state() {
    let resource = Resource::<Gadget>::new();

    let resp = resource.import_state(ImportStateRequest { id: "ns1/name1".into() });
    let state = resp.state.unwrap();
    assert_eq!(state.metadata.namespace, "ns1");
    assert_eq!(state.metadata.name, "name1");
    assert_eq!(state.id, Attr::Known("ns1/name1".to_string()));

    for bad in ["badformat", "/name"] {
        let resp = resource.import_state(ImportStateRequest { id: bad.into() });
        assert!(resp.state.is_none());
        let diag = resp.diagnostics.iter().next().unwrap();
        assert_eq!(diag.summary, "Unexpected Import Identifier");
        assert!(diag.detail.contains(bad), "{}", diag.detail);
    }
}

#[tokio::test]
async fn test_import_then_read() {
    let (client, resource) = setup();
    client.insert(
        &Gadget::gvr(),
        json!({
            "apiVersion": "example.k8sform.dev/v1",
            "kind": "Gadget",
            "metadata": { "name": "existing", "namespace": "ns1" },
            "spec": { "size": 5, "color": "blue" }
        }),
    );

    let imported = resource
        .import_state(ImportStateRequest { id: "ns1/existing".into() })
        .state
        .unwrap();
    let state = resource.read(ReadRequest { state: imported }).await.state.unwrap();
    assert_eq!(state.spec.size, Some(5));
    assert_eq!(state.spec.color.as_deref(), Some("blue"));
    assert_eq!(state.id, Attr::Known("ns1/existing".to_string()));
}

#[test]
fn test_modify_plan_requires_replace() {
    let resource = Resource::<Gadget>::new();
    let prior = gadget("ns1", "g1");

    let resp = resource.modify_plan(ModifyPlanRequest {
        prior_state: None,
        planned_state: prior.clone(),
    });
    assert!(resp.requires_replace.is_empty());

    let mut planned = prior.clone();
    planned.spec.size = Some(9);
    let resp = resource.modify_plan(ModifyPlanRequest {
        prior_state: Some(prior.clone()),
        planned_state: planned,
    });
    assert!(resp.requires_replace.is_empty());

    let planned = gadget("ns2", "g2");
    let resp = resource.modify_plan(ModifyPlanRequest {
        prior_state: Some(prior),
        planned_state: planned,
    });
    let paths: Vec<String> = resp.requires_replace.iter().map(ToString::to_string).collect();
    assert_eq!(paths, vec!["metadata.name", "metadata.namespace"]);
}

#[tokio::test]
async fn test_unmarshal_error_reported() {
    let (client, resource) = setup();
    client.insert(
        &Gadget::gvr(),
        json!({
            "metadata": { "name": "odd", "namespace": "ns1" },
            "spec": { "size": "large" }
        }),
    );
    let resp = resource
        .read(ReadRequest {
            state: gadget("ns1", "odd"),
        })
        .await;
    assert!(resp.state.is_none());
    assert_eq!(resp.diagnostics.iter().next().unwrap().summary, "Unmarshal Error");
}
