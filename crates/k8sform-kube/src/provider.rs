//! Provider-wide configuration and the data injected into resources

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use k8sform_core::Attr;

use crate::client::DynamicClient;
use crate::error::{KubeError, Result};
use crate::kube_client::KubeDynamicClient;

/// Field manager used when neither the provider nor the resource sets one
pub const DEFAULT_FIELD_MANAGER: &str = "k8sform";

/// Environment overrides
pub const ENV_FIELD_MANAGER: &str = "K8SFORM_FIELD_MANAGER";
pub const ENV_FORCE_CONFLICTS: &str = "K8SFORM_FORCE_CONFLICTS";
pub const ENV_OFFLINE: &str = "K8SFORM_OFFLINE";

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Default field manager for server-side apply
    pub field_manager: String,
    /// Default for taking ownership of conflicting fields
    pub force_conflicts: bool,
    /// Disable every network operation
    pub offline: bool,
    /// Kubeconfig context; the current context when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            force_conflicts: false,
            offline: false,
            context: None,
        }
    }
}

impl ProviderConfig {
    /// Load from a YAML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| KubeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (`K8SFORM_FIELD_MANAGER`, `K8SFORM_FORCE_CONFLICTS`,
    /// `K8SFORM_OFFLINE`)
    pub fn apply_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(field_manager) = lookup(ENV_FIELD_MANAGER) {
            self.field_manager = field_manager;
        }
        if let Some(raw) = lookup(ENV_FORCE_CONFLICTS) {
            self.force_conflicts = parse_bool(ENV_FORCE_CONFLICTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_OFFLINE) {
            self.offline = parse_bool(ENV_OFFLINE, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.field_manager.trim().is_empty() {
            return Err(KubeError::InvalidConfig(
                "field_manager must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the provider data, connecting to the cluster unless offline
    pub async fn build(&self) -> Result<ProviderData> {
        if self.offline {
            tracing::info!("provider configured offline, network operations are disabled");
            return Ok(ProviderData::offline()
                .with_field_manager(&self.field_manager)
                .with_force_conflicts(self.force_conflicts));
        }

        let client = match &self.context {
            Some(context) => KubeDynamicClient::for_context(context).await?,
            None => KubeDynamicClient::try_default().await?,
        };
        tracing::info!(
            context = self.context.as_deref().unwrap_or("<current>"),
            field_manager = %self.field_manager,
            "connected to Kubernetes"
        );
        Ok(self.into_provider_data(Arc::new(client)))
    }

    /// Provider data around an existing client
    pub fn into_provider_data(&self, client: Arc<dyn DynamicClient>) -> ProviderData {
        ProviderData {
            client: Some(client),
            field_manager: self.field_manager.clone(),
            force_conflicts: self.force_conflicts,
            offline: self.offline,
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(KubeError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

/// Data shared by every resource of a configured provider
#[derive(Clone)]
pub struct ProviderData {
    client: Option<Arc<dyn DynamicClient>>,
    pub field_manager: String,
    pub force_conflicts: bool,
    pub offline: bool,
}

impl std::fmt::Debug for ProviderData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderData")
            .field("client", &self.client.as_ref().map(|_| "<dynamic client>"))
            .field("field_manager", &self.field_manager)
            .field("force_conflicts", &self.force_conflicts)
            .field("offline", &self.offline)
            .finish()
    }
}

impl ProviderData {
    pub fn new(client: Arc<dyn DynamicClient>) -> Self {
        Self {
            client: Some(client),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            force_conflicts: false,
            offline: false,
        }
    }

    /// Provider data with network operations disabled
    pub fn offline() -> Self {
        Self {
            client: None,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            force_conflicts: false,
            offline: true,
        }
    }

    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }

    pub fn with_force_conflicts(mut self, force: bool) -> Self {
        self.force_conflicts = force;
        self
    }

    pub fn client(&self) -> Option<&Arc<dyn DynamicClient>> {
        self.client.as_ref()
    }

    /// The resource's field manager when known, else the provider default
    pub fn resolve_field_manager(&self, resource: &Attr<String>) -> String {
        resource.known_or(self.field_manager.clone())
    }

    /// The resource's force-conflicts flag when known, else the provider default
    pub fn resolve_force_conflicts(&self, resource: &Attr<bool>) -> bool {
        resource.known_or(self.force_conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDynamicClient;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.field_manager, "k8sform");
        assert!(!config.force_conflicts);
        assert!(!config.offline);
    }

    #[test]
    fn test_from_yaml() {
        let config = ProviderConfig::from_yaml_str(
            "field_manager: platform-team\nforce_conflicts: true\ncontext: kind-hive\n",
        )
        .unwrap();
        assert_eq!(config.field_manager, "platform-team");
        assert!(config.force_conflicts);
        assert_eq!(config.context.as_deref(), Some("kind-hive"));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_and_empty() {
        assert!(ProviderConfig::from_yaml_str("fieldManager: x\n").is_err());
        assert!(ProviderConfig::from_yaml_str("field_manager: ''\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provider.yaml");
        std::fs::write(&path, "offline: true\n").unwrap();
        let config = ProviderConfig::load_from(&path).unwrap();
        assert!(config.offline);
        assert_eq!(config.field_manager, DEFAULT_FIELD_MANAGER);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_FIELD_MANAGER, "ci"),
            (ENV_FORCE_CONFLICTS, "yes"),
            (ENV_OFFLINE, "0"),
        ]
        .into_iter()
        .collect();
        let config = ProviderConfig::default()
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.field_manager, "ci");
        assert!(config.force_conflicts);
        assert!(!config.offline);

        let err = ProviderConfig::default()
            .apply_env_overrides(|k| (k == ENV_OFFLINE).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("K8SFORM_OFFLINE"));
    }

    #[tokio::test]
    async fn test_offline_build_skips_client() {
        let config = ProviderConfig {
            offline: true,
            field_manager: "ops".into(),
            ..Default::default()
        };
        let data = config.build().await.unwrap();
        assert!(data.offline);
        assert!(data.client().is_none());
        assert_eq!(data.field_manager, "ops");
    }

    #[test]
    fn test_resolution() {
        let data = ProviderData::new(Arc::new(MockDynamicClient::new()))
            .with_field_manager("provider")
            .with_force_conflicts(true);

        assert_eq!(data.resolve_field_manager(&Attr::Null), "provider");
        assert_eq!(data.resolve_field_manager(&Attr::Unknown), "provider");
        assert_eq!(
            data.resolve_field_manager(&Attr::Known("resource".into())),
            "resource"
        );

        assert!(data.resolve_force_conflicts(&Attr::Null));
        assert!(data.resolve_force_conflicts(&Attr::Unknown));
        assert!(!data.resolve_force_conflicts(&Attr::Known(false)));
    }
}
