// src/sandbox/k8s.rs

//! Kubernetes-backed [`SandboxRuntime`]: one pod per unit.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, LogParams, PostParams};
use kube::Client;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{SandboxRuntime, UnitPhase, UnitSpec};

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "taskrun";

/// Pods API scoped to a single namespace.
///
/// The client is created lazily on first use from the inferred kube config
/// (in-cluster service account or `~/.kube/config`). A connection failure
/// therefore surfaces as an error of the first operation, not at startup.
pub struct KubeRuntime {
    namespace: Option<String>,
    pods: OnceCell<Api<Pod>>,
}

impl KubeRuntime {
    /// `namespace = None` uses the client's default namespace.
    pub fn new(namespace: Option<String>) -> Self {
        Self {
            namespace,
            pods: OnceCell::new(),
        }
    }

    async fn pods(&self) -> Result<&Api<Pod>> {
        self.pods
            .get_or_try_init(|| async {
                let client = Client::try_default()
                    .await
                    .context("connecting to Kubernetes API")?;
                let namespace = self
                    .namespace
                    .clone()
                    .unwrap_or_else(|| client.default_namespace().to_string());
                info!(namespace = %namespace, "connected to Kubernetes API");
                Ok::<_, anyhow::Error>(Api::namespaced(client, &namespace))
            })
            .await
    }
}

/// Translate a unit spec into a bare, never-restarting pod.
pub fn build_pod(spec: &UnitSpec) -> Pod {
    let labels = BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string())]);

    Pod {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            active_deadline_seconds: spec
                .deadline
                .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX)),
            containers: vec![Container {
                name: spec.container.clone(),
                image: Some(spec.image.clone()),
                command: Some(spec.command.as_slice().to_vec()),
                ..Container::default()
            }],
            ..PodSpec::default()
        }),
        ..Pod::default()
    }
}

/// Phase of a pod, if the API server has reported one yet.
pub fn pod_phase(pod: &Pod) -> Option<UnitPhase> {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .map(UnitPhase::from_phase_str)
}

/// The API server answered 404 for the object.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

impl SandboxRuntime for KubeRuntime {
    fn create_unit<'a>(
        &'a self,
        spec: &'a UnitSpec,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let pods = self.pods().await?;
            let pod = build_pod(spec);
            pods.create(&PostParams::default(), &pod)
                .await
                .with_context(|| format!("creating pod '{}'", spec.name))?;
            debug!(pod = %spec.name, "pod created");
            Ok(())
        })
    }

    fn unit_phase<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UnitPhase>>> + Send + 'a>> {
        Box::pin(async move {
            let pods = self.pods().await?;
            let pod = pods
                .get_opt(name)
                .await
                .with_context(|| format!("reading pod '{name}'"))?;
            Ok(pod.as_ref().and_then(pod_phase))
        })
    }

    fn unit_logs<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let pods = self.pods().await?;
            let logs = pods
                .logs(name, &LogParams::default())
                .await
                .with_context(|| format!("fetching logs of pod '{name}'"))?;
            Ok(logs)
        })
    }

    fn delete_unit<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let pods = self.pods().await?;
            let params = DeleteParams {
                grace_period_seconds: Some(0),
                ..DeleteParams::default()
            };
            match pods.delete(name, &params).await {
                Ok(_) => Ok(()),
                Err(err) if is_not_found(&err) => {
                    debug!(pod = %name, "pod already gone");
                    Ok(())
                }
                Err(err) => Err(err).with_context(|| format!("deleting pod '{name}'")),
            }
        })
    }
}
