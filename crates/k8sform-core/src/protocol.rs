//! Provider protocol: typed requests and responses for resources and data sources
//!
//! The host calls `metadata` and `schema` first, then `configure` once the provider is
//! configured, then the lifecycle operations. Every operation returns diagnostics; state is
//! only returned when the operation succeeded.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::path::AttributePath;
use crate::schema::Schema;

/// Provider-wide data injected into resources at configure time
pub type ProviderHandle = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone)]
pub struct MetadataRequest {
    /// Provider type name (`k8s`)
    pub provider_type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataResponse {
    pub type_name: String,
}

#[derive(Clone, Default)]
pub struct ConfigureRequest {
    pub provider_data: Option<ProviderHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigureResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct ValidateConfigRequest<M> {
    pub config: M,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateConfigResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct ModifyPlanRequest<M> {
    /// `None` when the resource is being created
    pub prior_state: Option<M>,
    pub planned_state: M,
}

#[derive(Debug, Clone, Default)]
pub struct ModifyPlanResponse {
    /// Attributes whose change forces replacement
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct CreateRequest<M> {
    pub planned_state: M,
}

#[derive(Debug, Clone)]
pub struct ReadRequest<M> {
    pub state: M,
}

#[derive(Debug, Clone)]
pub struct UpdateRequest<M> {
    pub prior_state: M,
    pub planned_state: M,
}

#[derive(Debug, Clone)]
pub struct DeleteRequest<M> {
    pub state: M,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct ImportStateRequest {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ReadDataSourceRequest<M> {
    pub config: M,
}

/// Response carrying resulting state, or diagnostics explaining why there is none
#[derive(Debug, Clone)]
pub struct StateResponse<M> {
    /// `None` on failure, or when the resource no longer exists
    pub state: Option<M>,
    pub diagnostics: Diagnostics,
}

impl<M> StateResponse<M> {
    pub fn ok(state: M) -> Self {
        Self {
            state: Some(state),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn failed(diagnostics: impl Into<Diagnostics>) -> Self {
        Self {
            state: None,
            diagnostics: diagnostics.into(),
        }
    }

    /// Resource is gone; the host drops it from state
    pub fn removed() -> Self {
        Self {
            state: None,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }
}

impl<M> From<Diagnostic> for StateResponse<M> {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::failed(diagnostic)
    }
}

pub type CreateResponse<M> = StateResponse<M>;
pub type ReadResponse<M> = StateResponse<M>;
pub type UpdateResponse<M> = StateResponse<M>;
pub type ImportStateResponse<M> = StateResponse<M>;
pub type ReadDataSourceResponse<M> = StateResponse<M>;

/// Managed resource lifecycle
#[async_trait]
pub trait ResourceService: Send + Sync {
    type Model: Send + Sync;

    fn metadata(&self, req: MetadataRequest) -> MetadataResponse;

    fn schema(&self) -> Schema;

    fn configure(&mut self, req: ConfigureRequest) -> ConfigureResponse;

    fn validate_config(&self, req: ValidateConfigRequest<Self::Model>) -> ValidateConfigResponse;

    fn modify_plan(&self, req: ModifyPlanRequest<Self::Model>) -> ModifyPlanResponse;

    async fn create(&self, req: CreateRequest<Self::Model>) -> CreateResponse<Self::Model>;

    async fn read(&self, req: ReadRequest<Self::Model>) -> ReadResponse<Self::Model>;

    async fn update(&self, req: UpdateRequest<Self::Model>) -> UpdateResponse<Self::Model>;

    async fn delete(&self, req: DeleteRequest<Self::Model>) -> DeleteResponse;

    fn import_state(&self, req: ImportStateRequest) -> ImportStateResponse<Self::Model>;
}

/// Read-only data source
#[async_trait]
pub trait DataSourceService: Send + Sync {
    type Model: Send + Sync;

    fn metadata(&self, req: MetadataRequest) -> MetadataResponse;

    fn schema(&self) -> Schema;

    async fn read(
        &self,
        req: ReadDataSourceRequest<Self::Model>,
    ) -> ReadDataSourceResponse<Self::Model>;
}
