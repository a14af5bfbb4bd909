//! Generic managed resource for any custom resource type
//!
//! Every operation follows the same shape: check the provider is usable, validate the
//! configuration against the schema, issue one API call (plus readiness polling for
//! configured wait conditions) and replace `metadata`/`spec` with what the server returned.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::marker::PhantomData;
use std::sync::Arc;

use k8sform_core::protocol::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DeleteRequest,
    DeleteResponse, ImportStateRequest, ImportStateResponse, MetadataRequest, MetadataResponse,
    ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse, UpdateRequest,
    UpdateResponse, ValidateConfigRequest, ValidateConfigResponse,
};
use k8sform_core::{
    Attr, Attribute, Diagnostics, Manifest, ObjectMetadata, ObservedObject,
    ResourceId, ResourceService, Schema, StateResponse, Validator, attributes,
};

use crate::client::{ApplyParams, DeletionPropagation, DynamicClient};
use crate::crd::{CustomResourceType, metadata_attribute};
use crate::error::{KubeError, Result, Verb};
use crate::provider::ProviderData;
use crate::wait::{WaitCondition, parse_conditions, wait_for_conditions};

/// State and configuration of a managed custom resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceModel<S> {
    /// `<namespace>/<name>`, computed
    pub id: Attr<String>,
    /// Overrides the provider's field manager
    pub field_manager: Attr<String>,
    /// Overrides the provider's force-conflicts flag
    pub force_conflicts: Attr<bool>,
    /// Readiness checks after create and update
    pub wait_for: Vec<WaitCondition>,
    pub deletion_propagation: Option<DeletionPropagation>,
    pub metadata: ObjectMetadata,
    pub spec: S,
}

impl<S: Default> ResourceModel<S> {
    pub fn new(metadata: ObjectMetadata, spec: S) -> Self {
        Self {
            metadata,
            spec,
            ..Default::default()
        }
    }
}

impl<S> ResourceModel<S> {
    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = Attr::Known(field_manager.into());
        self
    }

    pub fn with_force_conflicts(mut self, force: bool) -> Self {
        self.force_conflicts = Attr::Known(force);
        self
    }

    pub fn with_wait_for(mut self, condition: WaitCondition) -> Self {
        self.wait_for.push(condition);
        self
    }

    pub fn with_deletion_propagation(mut self, propagation: DeletionPropagation) -> Self {
        self.deletion_propagation = Some(propagation);
        self
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::from_metadata(&self.metadata)
    }
}

/// Configuration document checked by the schema validator (wire names)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigDocument<'a, S> {
    #[serde(skip_serializing_if = "not_known")]
    field_manager: &'a Attr<String>,
    #[serde(skip_serializing_if = "not_known")]
    force_conflicts: &'a Attr<bool>,
    #[serde(skip_serializing_if = "no_conditions")]
    wait_for: &'a [WaitCondition],
    #[serde(skip_serializing_if = "Option::is_none")]
    deletion_propagation: Option<DeletionPropagation>,
    metadata: &'a ObjectMetadata,
    spec: &'a S,
}

fn not_known<T>(attr: &&Attr<T>) -> bool {
    !attr.is_known()
}

fn no_conditions(conditions: &&[WaitCondition]) -> bool {
    conditions.is_empty()
}

fn config_document<S: Serialize>(model: &ResourceModel<S>) -> Result<JsonValue> {
    let doc = ConfigDocument {
        field_manager: &model.field_manager,
        force_conflicts: &model.force_conflicts,
        wait_for: &model.wait_for,
        deletion_propagation: model.deletion_propagation,
        metadata: &model.metadata,
        spec: &model.spec,
    };
    serde_json::to_value(doc).map_err(|e| KubeError::Marshal {
        kind: "configuration".to_string(),
        message: e.to_string(),
    })
}

/// Schema of a managed resource of type `C`
pub fn resource_schema<C: CustomResourceType>() -> Schema {
    Schema::new(C::description())
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Identifier in the form <namespace>/<name>"),
        )
        .with_attribute(
            "field_manager",
            Attribute::optional_string()
                .with_description("Field manager for server-side apply; defaults to the provider setting")
                .with_validator(Validator::not_empty()),
        )
        .with_attribute(
            "force_conflicts",
            Attribute::optional_bool().with_description(
                "Take ownership of fields managed by others; defaults to the provider setting",
            ),
        )
        .with_attribute("wait_for", wait_for_attribute())
        .with_attribute(
            "deletion_propagation",
            Attribute::optional_string()
                .with_description("Propagation policy for dependents when the object is deleted")
                .with_validator(Validator::one_of(DeletionPropagation::VALUES)),
        )
        .with_attribute("metadata", metadata_attribute())
        .with_attribute("spec", C::spec_attribute())
}

fn wait_for_attribute() -> Attribute {
    Attribute::optional_object_list(attributes([
        (
            "jsonpath",
            Attribute::required_string()
                .with_description("JSONPath into the object, such as {.status.phase}")
                .with_validator(Validator::not_empty()),
        ),
        (
            "value",
            Attribute::optional_string().with_description("Expected value; any value when unset"),
        ),
        (
            "timeout",
            Attribute::optional_string()
                .with_description("How long to wait, such as 30s or 5m (default 30s)")
                .with_validator(Validator::matches(
                    r"^([0-9]+[a-z]+ ?)+$",
                    "value must be a duration such as 30s or 5m",
                )),
        ),
    ]))
    .with_description("Conditions to wait for after the object is applied")
}

/// Validate a configuration document against `schema`
pub(crate) fn validate_document(schema: &Schema, document: &JsonValue) -> Result<()> {
    let result = schema.validator()?.validate(document);
    if result.is_valid {
        Ok(())
    } else {
        Err(KubeError::Validation {
            failures: result.errors,
        })
    }
}

pub(crate) fn check_spec<C: CustomResourceType>(spec: &C::Spec) -> Result<()> {
    let failures = C::validate_spec(spec);
    if failures.is_empty() {
        Ok(())
    } else {
        Err(KubeError::Validation { failures })
    }
}

/// Managed resource adapter for custom resource type `C`
pub struct Resource<C: CustomResourceType> {
    provider: Option<ProviderData>,
    _type: PhantomData<fn() -> C>,
}

impl<C: CustomResourceType> Default for Resource<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CustomResourceType> Resource<C> {
    /// Unconfigured resource; `configure` or [`Self::with_provider_data`] binds a client
    pub fn new() -> Self {
        Self {
            provider: None,
            _type: PhantomData,
        }
    }

    pub fn with_provider_data(provider: ProviderData) -> Self {
        Self {
            provider: Some(provider),
            _type: PhantomData,
        }
    }

    pub fn provider_data(&self) -> Option<&ProviderData> {
        self.provider.as_ref()
    }

    fn type_name() -> String {
        format!("{}_{}", crate::PROVIDER_TYPE_NAME, C::type_name_suffix())
    }

    /// Provider and client, failing fast when offline or unconfigured
    fn connection(&self) -> Result<(&ProviderData, &Arc<dyn DynamicClient>)> {
        let provider = self.provider.as_ref().ok_or(KubeError::NotConfigured)?;
        if provider.offline {
            return Err(KubeError::Offline {
                type_name: Self::type_name(),
            });
        }
        let client = provider.client().ok_or(KubeError::NotConfigured)?;
        Ok((provider, client))
    }

    fn validate(&self, model: &ResourceModel<C::Spec>) -> Result<()> {
        validate_document(&resource_schema::<C>(), &config_document(model)?)?;
        check_spec::<C>(&model.spec)?;
        parse_conditions(&model.wait_for)?;
        Ok(())
    }

    /// Apply the planned model, wait for its conditions, and return the observed state
    async fn apply(
        &self,
        planned: ResourceModel<C::Spec>,
        id: Option<Attr<String>>,
    ) -> Result<ResourceModel<C::Spec>> {
        let (provider, client) = self.connection()?;
        self.validate(&planned)?;

        let api_version = C::api_version();
        let manifest = Manifest {
            api_version: &api_version,
            kind: C::KIND,
            metadata: &planned.metadata,
            spec: &planned.spec,
        };
        let body = serde_json::to_value(&manifest).map_err(|e| KubeError::Marshal {
            kind: C::KIND.to_string(),
            message: e.to_string(),
        })?;

        let params = ApplyParams {
            field_manager: provider.resolve_field_manager(&planned.field_manager),
            force: provider.resolve_force_conflicts(&planned.force_conflicts),
        };
        let namespace = planned.metadata.namespace.as_str();
        let name = planned.metadata.name.as_str();
        let gvr = C::gvr();

        tracing::info!(
            kind = C::KIND,
            namespace,
            name,
            field_manager = %params.field_manager,
            force = params.force,
            "applying"
        );
        let applied = client
            .apply(&gvr, namespace, name, &body, &params)
            .await
            .map_err(|e| KubeError::request(Verb::Patch, C::KIND, namespace, name, e))?;

        let observed = if planned.wait_for.is_empty() {
            applied
        } else {
            wait_for_conditions(client.as_ref(), &gvr, namespace, name, &planned.wait_for, applied)
                .await?
        };

        let observed = parse_observed::<C>(observed)?;
        let id = id.unwrap_or_else(|| Attr::Known(planned.resource_id().to_string()));
        Ok(ResourceModel {
            id,
            metadata: observed.metadata,
            spec: observed.spec,
            ..planned
        })
    }

    /// `None` when the object no longer exists
    async fn fetch(&self, state: ResourceModel<C::Spec>) -> Result<Option<ResourceModel<C::Spec>>> {
        let (_, client) = self.connection()?;
        let namespace = state.metadata.namespace.as_str();
        let name = state.metadata.name.as_str();

        let object = match client.get(&C::gvr(), namespace, name).await {
            Ok(object) => object,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    kind = C::KIND,
                    namespace,
                    name,
                    "object not found, removing from state"
                );
                return Ok(None);
            }
            Err(e) => return Err(KubeError::request(Verb::Get, C::KIND, namespace, name, e)),
        };

        let observed = parse_observed::<C>(object)?;
        let id = match state.id {
            Attr::Known(id) => Attr::Known(id),
            _ => Attr::Known(ResourceId::from_metadata(&observed.metadata).to_string()),
        };
        Ok(Some(ResourceModel {
            id,
            metadata: observed.metadata,
            spec: observed.spec,
            ..state
        }))
    }

    async fn remove(&self, state: &ResourceModel<C::Spec>) -> Result<()> {
        let (_, client) = self.connection()?;
        let namespace = state.metadata.namespace.as_str();
        let name = state.metadata.name.as_str();

        tracing::info!(
            kind = C::KIND,
            namespace,
            name,
            propagation = ?state.deletion_propagation,
            "deleting"
        );
        client
            .delete(&C::gvr(), namespace, name, state.deletion_propagation)
            .await
            .map_err(|e| KubeError::request(Verb::Delete, C::KIND, namespace, name, e))
    }
}

pub(crate) fn parse_observed<C: CustomResourceType>(
    object: JsonValue,
) -> Result<ObservedObject<C::Spec>> {
    serde_json::from_value(object).map_err(|e| KubeError::Unmarshal {
        kind: C::KIND.to_string(),
        message: e.to_string(),
    })
}

fn respond<M>(result: Result<M>) -> StateResponse<M> {
    match result {
        Ok(state) => StateResponse::ok(state),
        Err(e) => {
            tracing::debug!(error = %e, "operation failed");
            StateResponse::failed(e)
        }
    }
}

#[async_trait]
impl<C: CustomResourceType> ResourceService for Resource<C> {
    type Model = ResourceModel<C::Spec>;

    fn metadata(&self, req: MetadataRequest) -> MetadataResponse {
        MetadataResponse {
            type_name: format!("{}_{}", req.provider_type_name, C::type_name_suffix()),
        }
    }

    fn schema(&self) -> Schema {
        resource_schema::<C>()
    }

    fn configure(&mut self, req: ConfigureRequest) -> ConfigureResponse {
        let Some(handle) = req.provider_data else {
            return ConfigureResponse::default();
        };

        match handle.downcast_ref::<ProviderData>() {
            Some(data) => {
                self.provider = Some(data.clone());
                ConfigureResponse::default()
            }
            None => {
                let err = KubeError::UnexpectedProviderData;
                ConfigureResponse {
                    diagnostics: err.into_diagnostics(),
                }
            }
        }
    }

    fn validate_config(&self, req: ValidateConfigRequest<Self::Model>) -> ValidateConfigResponse {
        let diagnostics = match self.validate(&req.config) {
            Ok(()) => Diagnostics::new(),
            Err(e) => e.into_diagnostics(),
        };
        ValidateConfigResponse { diagnostics }
    }

    fn modify_plan(&self, req: ModifyPlanRequest<Self::Model>) -> ModifyPlanResponse {
        let Some(prior) = req.prior_state else {
            return ModifyPlanResponse::default();
        };

        let documents = config_document(&prior).and_then(|prior| {
            config_document(&req.planned_state).map(|planned| (prior, planned))
        });
        let (prior, planned) = match documents {
            Ok(documents) => documents,
            Err(e) => {
                return ModifyPlanResponse {
                    requires_replace: Vec::new(),
                    diagnostics: e.into_diagnostics(),
                };
            }
        };

        let requires_replace = resource_schema::<C>()
            .replace_triggers()
            .into_iter()
            .filter(|trigger| prior.pointer(&trigger.pointer) != planned.pointer(&trigger.pointer))
            .map(|trigger| trigger.path)
            .collect();

        ModifyPlanResponse {
            requires_replace,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, req: CreateRequest<Self::Model>) -> CreateResponse<Self::Model> {
        respond(self.apply(req.planned_state, None).await)
    }

    async fn read(&self, req: ReadRequest<Self::Model>) -> ReadResponse<Self::Model> {
        match self.fetch(req.state).await {
            Ok(Some(state)) => StateResponse::ok(state),
            Ok(None) => StateResponse::removed(),
            Err(e) => StateResponse::failed(e),
        }
    }

    async fn update(&self, req: UpdateRequest<Self::Model>) -> UpdateResponse<Self::Model> {
        let id = req.prior_state.id;
        respond(self.apply(req.planned_state, Some(id)).await)
    }

    async fn delete(&self, req: DeleteRequest<Self::Model>) -> DeleteResponse {
        let diagnostics = match self.remove(&req.state).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => e.into_diagnostics(),
        };
        DeleteResponse { diagnostics }
    }

    fn import_state(&self, req: ImportStateRequest) -> ImportStateResponse<Self::Model> {
        match req.id.parse::<ResourceId>() {
            Ok(id) => StateResponse::ok(ResourceModel {
                id: Attr::Known(id.to_string()),
                metadata: ObjectMetadata::new(id.namespace, id.name),
                ..Default::default()
            }),
            Err(e) => StateResponse::failed(KubeError::from(e)),
        }
    }
}
