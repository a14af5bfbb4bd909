//! `kube`-backed dynamic client

use async_trait::async_trait;
use kube::{
    Client, Config,
    api::{Api, DeleteParams, DynamicObject, Patch, PatchParams, PropagationPolicy},
    config::KubeConfigOptions,
    core::GroupVersionKind,
    discovery::ApiResource,
};
use serde_json::Value as JsonValue;

use crate::client::{
    ApplyParams, ClientError, DeletionPropagation, DynamicClient, GroupVersionResource,
};
use crate::error::{KubeError, Result};

/// Dynamic client talking to a real API server
#[derive(Clone)]
pub struct KubeDynamicClient {
    client: Client,
}

impl KubeDynamicClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client from the environment (in-cluster config or the default kubeconfig context)
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| KubeError::Client(e.to_string()))?;
        Ok(Self::new(client))
    }

    /// Client for a named kubeconfig context
    pub async fn for_context(context: &str) -> Result<Self> {
        let options = KubeConfigOptions {
            context: Some(context.to_string()),
            ..Default::default()
        };
        let config = Config::from_kubeconfig(&options)
            .await
            .map_err(|e| KubeError::Client(e.to_string()))?;
        let client = Client::try_from(config).map_err(|e| KubeError::Client(e.to_string()))?;
        Ok(Self::new(client))
    }

    /// Get the underlying Kubernetes client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api(&self, gvr: &GroupVersionResource, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&gvr.group, &gvr.version, &gvr.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &gvr.resource);
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

#[async_trait]
impl DynamicClient for KubeDynamicClient {
    async fn apply(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
        object: &JsonValue,
        params: &ApplyParams,
    ) -> std::result::Result<JsonValue, ClientError> {
        let patch_params = patch_params(params);

        tracing::debug!(
            resource = %gvr,
            namespace,
            name,
            field_manager = %params.field_manager,
            force = params.force,
            "server-side apply"
        );

        let applied = self
            .api(gvr, namespace)
            .patch(name, &patch_params, &Patch::Apply(object))
            .await
            .map_err(client_error)?;
        to_json(&applied)
    }

    async fn get(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<JsonValue, ClientError> {
        tracing::debug!(resource = %gvr, namespace, name, "get");
        let object = self
            .api(gvr, namespace)
            .get(name)
            .await
            .map_err(client_error)?;
        to_json(&object)
    }

    async fn delete(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
        propagation: Option<DeletionPropagation>,
    ) -> std::result::Result<(), ClientError> {
        let params = DeleteParams {
            propagation_policy: propagation.map(propagation_policy),
            ..Default::default()
        };

        tracing::debug!(resource = %gvr, namespace, name, ?propagation, "delete");
        self.api(gvr, namespace)
            .delete(name, &params)
            .await
            .map_err(client_error)?;
        Ok(())
    }
}

/// Server-side apply with strict field validation
fn patch_params(params: &ApplyParams) -> PatchParams {
    let patch_params = PatchParams::apply(&params.field_manager).validation_strict();
    if params.force {
        patch_params.force()
    } else {
        patch_params
    }
}

fn propagation_policy(propagation: DeletionPropagation) -> PropagationPolicy {
    match propagation {
        DeletionPropagation::Background => PropagationPolicy::Background,
        DeletionPropagation::Foreground => PropagationPolicy::Foreground,
        DeletionPropagation::Orphan => PropagationPolicy::Orphan,
    }
}

fn to_json(object: &DynamicObject) -> std::result::Result<JsonValue, ClientError> {
    serde_json::to_value(object).map_err(|e| ClientError::Decode(e.to_string()))
}

fn client_error(err: kube::Error) -> ClientError {
    match err {
        kube::Error::Api(resp) => ClientError::Status {
            code: resp.code,
            reason: resp.reason,
            message: resp.message,
        },
        kube::Error::SerdeError(e) => ClientError::Decode(e.to_string()),
        other => ClientError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_keep_status() {
        let err = client_error(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".into(),
            message: "dnszones.hive.openshift.io \"zone-1\" not found".into(),
            reason: "NotFound".into(),
            code: 404,
        }));
        assert!(err.is_not_found());
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_patch_params_are_strict() {
        let params = patch_params(&ApplyParams {
            field_manager: "k8sform".into(),
            force: false,
        });
        assert!(matches!(
            params.field_validation,
            Some(kube::api::ValidationDirective::Strict)
        ));
        assert_eq!(params.field_manager.as_deref(), Some("k8sform"));
        assert!(!params.force);
        assert!(!params.dry_run);
    }

    #[test]
    fn test_patch_params_force() {
        let params = patch_params(&ApplyParams {
            field_manager: "ops".into(),
            force: true,
        });
        assert!(params.force);
        assert_eq!(params.field_manager.as_deref(), Some("ops"));
        assert!(matches!(
            params.field_validation,
            Some(kube::api::ValidationDirective::Strict)
        ));
    }

    #[test]
    fn test_propagation_mapping() {
        assert!(matches!(
            propagation_policy(DeletionPropagation::Orphan),
            PropagationPolicy::Orphan
        ));
        assert!(matches!(
            propagation_policy(DeletionPropagation::Foreground),
            PropagationPolicy::Foreground
        ));
    }
}
