//! Post-apply readiness checks

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::{Instant, sleep};

use crate::client::{DynamicClient, GroupVersionResource};
use crate::error::{KubeError, Result, Verb};
use crate::jsonpath::JsonPath;

/// Default time to wait for a single condition
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between two GETs while waiting
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Readiness check evaluated after create and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitCondition {
    /// JSONPath into the object (`{.status.phase}`)
    pub jsonpath: String,

    /// Expected value; any non-null value satisfies the condition when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_WAIT_TIMEOUT
}

impl WaitCondition {
    pub fn new(jsonpath: impl Into<String>) -> Self {
        Self {
            jsonpath: jsonpath.into(),
            value: None,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse a human-readable timeout such as `30s` or `5m`
    pub fn parse_timeout(raw: &str) -> Result<Duration> {
        humantime_serde::re::humantime::parse_duration(raw)
            .map_err(|e| KubeError::InvalidConfig(format!("invalid timeout '{}': {}", raw, e)))
    }
}

/// Check every condition path before any network call
pub fn parse_conditions(conditions: &[WaitCondition]) -> Result<Vec<JsonPath>> {
    conditions.iter().map(|c| JsonPath::parse(&c.jsonpath)).collect()
}

/// Wait for every condition in order and return the freshest object observed
///
/// `applied` is the object returned by the apply; it is checked first so an already
/// satisfied condition needs no extra GET.
pub async fn wait_for_conditions(
    client: &dyn DynamicClient,
    gvr: &GroupVersionResource,
    namespace: &str,
    name: &str,
    conditions: &[WaitCondition],
    applied: JsonValue,
) -> Result<JsonValue> {
    let paths = parse_conditions(conditions)?;
    let mut latest = applied;

    for (condition, path) in conditions.iter().zip(&paths) {
        let start = Instant::now();
        tracing::debug!(
            jsonpath = %condition.jsonpath,
            value = condition.value.as_deref().unwrap_or("<any>"),
            timeout = ?condition.timeout,
            "waiting for condition"
        );

        loop {
            if path.matches(&latest, condition.value.as_deref()) {
                tracing::debug!(jsonpath = %condition.jsonpath, "condition met");
                break;
            }
            if start.elapsed() >= condition.timeout {
                return Err(KubeError::WaitTimeout {
                    jsonpath: condition.jsonpath.clone(),
                    timeout: condition.timeout,
                });
            }

            sleep(POLL_INTERVAL.min(condition.timeout.saturating_sub(start.elapsed()))).await;

            latest = client
                .get(gvr, namespace, name)
                .await
                .map_err(|e| KubeError::request(Verb::Get, &gvr.kind, namespace, name, e))?;
        }
    }

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApplyParams, ClientError};
    use crate::mock::{MockDynamicClient, MockVerb};
    use serde_json::json;

    fn gvr() -> GroupVersionResource {
        GroupVersionResource::new("hive.openshift.io", "v1", "machinepools", "MachinePool")
    }

    async fn seeded() -> (MockDynamicClient, JsonValue) {
        let client = MockDynamicClient::new();
        let applied = client
            .apply(
                &gvr(),
                "hive",
                "pool-a",
                &json!({ "metadata": { "name": "pool-a", "namespace": "hive" } }),
                &ApplyParams {
                    field_manager: "k8sform".into(),
                    force: false,
                },
            )
            .await
            .unwrap();
        client.reset_counts();
        (client, applied)
    }

    #[test]
    fn test_condition_deserialization() {
        let c: WaitCondition =
            serde_json::from_value(json!({ "jsonpath": "{.status.phase}", "timeout": "5m" })).unwrap();
        assert_eq!(c.timeout, Duration::from_secs(300));
        assert_eq!(c.value, None);

        let c: WaitCondition = serde_json::from_value(json!({ "jsonpath": ".status" })).unwrap();
        assert_eq!(c.timeout, DEFAULT_WAIT_TIMEOUT);

        assert!(serde_json::from_value::<WaitCondition>(json!({ "jsonpath": ".a", "timeout": "soon" })).is_err());
        assert_eq!(WaitCondition::parse_timeout("90s").unwrap(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_satisfied_needs_no_get() {
        let (client, applied) = seeded().await;
        let conditions = [WaitCondition::new("{.metadata.name}").with_value("pool-a")];

        let latest = wait_for_conditions(&client, &gvr(), "hive", "pool-a", &conditions, applied.clone())
            .await
            .unwrap();
        assert_eq!(latest, applied);
        assert_eq!(client.operation_counts().gets, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_status_appears() {
        let (client, applied) = seeded().await;
        client.status_after_gets("hive", "pool-a", 2, json!({ "replicas": 3 }));
        let conditions = [WaitCondition::new("{.status.replicas}").with_value("3")];

        let latest = wait_for_conditions(&client, &gvr(), "hive", "pool-a", &conditions, applied)
            .await
            .unwrap();
        assert_eq!(latest["status"]["replicas"], 3);
        assert_eq!(client.operation_counts().gets, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_names_jsonpath() {
        let (client, applied) = seeded().await;
        let conditions = [WaitCondition::new("{.status.phase}")
            .with_value("Ready")
            .with_timeout(Duration::from_secs(5))];

        let err = wait_for_conditions(&client, &gvr(), "hive", "pool-a", &conditions, applied)
            .await
            .unwrap_err();
        match err {
            KubeError::WaitTimeout { jsonpath, timeout } => {
                assert_eq!(jsonpath, "{.status.phase}");
                assert_eq!(timeout, Duration::from_secs(5));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_failure_aborts() {
        let (client, applied) = seeded().await;
        client.fail_next(MockVerb::Get, ClientError::Transport("connection reset".into()));
        let conditions = [WaitCondition::new("{.status.phase}")];

        let err = wait_for_conditions(&client, &gvr(), "hive", "pool-a", &conditions, applied)
            .await
            .unwrap_err();
        assert_eq!(err.summary(), "Unable to GET resource");
    }

    #[tokio::test]
    async fn test_invalid_path_fails_before_polling() {
        let (client, applied) = seeded().await;
        let conditions = [WaitCondition::new(".status[*]")];
        let err = wait_for_conditions(&client, &gvr(), "hive", "pool-a", &conditions, applied)
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::InvalidJsonPath { .. }));
        assert_eq!(client.operation_counts().total(), 0);
    }
}
