//! Normalized records: the common `metadata`/`spec`/`status` fields shared by
//! the supported kinds.
//!
//! Decoding is lossy. Fields outside this projection are dropped, so
//! serializing a [`Record`] reproduces only what was captured.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::extract::Candidate;

/// The uniform projection of one resource document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Object metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Desired state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Spec>,
    /// Observed state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// Metadata common to all resources.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Object name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// Namespace, absent for cluster-scoped objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Canonical path of the object, when the server still reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Unique identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Owning objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

/// A reference to an owning object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerReference {
    /// Kind of the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Name of the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// UID of the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Spec fields common to the supported kinds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Service cluster IP.
    #[serde(default, rename = "clusterIP", skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
    /// Node external ID.
    #[serde(default, rename = "externalID", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Node a pod is scheduled on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Desired replica count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Service type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Pod containers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    /// Service ports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
}

/// A container declared in a pod spec.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Container name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Exposed ports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
}

/// A container or service port.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Port exposed by a container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_port: Option<i32>,
    /// Port exposed by a service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    /// `TCP`, `UDP` or `SCTP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Service target port, by number or name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<IntOrString>,
}

/// Status fields common to the supported kinds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// IP of the node hosting a pod.
    #[serde(default, rename = "hostIP", skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    /// Pod lifecycle phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Pod IP.
    #[serde(default, rename = "podIP", skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,
    /// Available replicas of a workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_replicas: Option<i32>,
    /// Ready replicas of a workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_replicas: Option<i32>,
    /// Updated replicas of a workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_replicas: Option<i32>,
    /// Per-container status of a pod.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_statuses: Vec<ContainerStatus>,
    /// Node system information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_info: Option<NodeInfo>,
}

/// Runtime status of one container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    /// Container name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the container passes its readiness probe.
    #[serde(default)]
    pub ready: bool,
    /// Number of restarts.
    #[serde(default)]
    pub restart_count: i32,
    /// Current state.
    #[serde(
        default,
        deserialize_with = "deserialize_state",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<ContainerState>,
}

/// The single current state of a container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerState {
    /// Executing.
    Running {
        /// When the container started.
        #[serde(
            default,
            rename = "startedAt",
            skip_serializing_if = "Option::is_none"
        )]
        started_at: Option<DateTime<Utc>>,
    },
    /// Not yet running.
    Waiting {
        /// Human-readable detail.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Machine-readable reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Finished executing.
    Terminated {
        /// When the container started.
        #[serde(
            default,
            rename = "startedAt",
            skip_serializing_if = "Option::is_none"
        )]
        started_at: Option<DateTime<Utc>>,
        /// When the container finished.
        #[serde(
            default,
            rename = "finishedAt",
            skip_serializing_if = "Option::is_none"
        )]
        finished_at: Option<DateTime<Utc>>,
        /// Machine-readable reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Exit status.
        #[serde(default, rename = "exitCode", skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
}

/// Wire shape of a container state: three optional members, at most one set.
#[derive(Deserialize)]
struct StateFields {
    #[serde(default)]
    running: Option<serde_json::Value>,
    #[serde(default)]
    waiting: Option<serde_json::Value>,
    #[serde(default)]
    terminated: Option<serde_json::Value>,
}

fn deserialize_state<'de, D>(deserializer: D) -> std::result::Result<Option<ContainerState>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let Some(fields) = Option::<StateFields>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let mut present = [
        ("running", fields.running),
        ("waiting", fields.waiting),
        ("terminated", fields.terminated),
    ]
    .into_iter()
    .filter_map(|(tag, value)| value.map(|v| (tag, v)));

    let Some((tag, value)) = present.next() else {
        return Ok(None);
    };

    if let Some((other, _)) = present.next() {
        return Err(D::Error::custom(format!(
            "container state is both {tag} and {other}"
        )));
    }

    let tagged = serde_json::Value::Object([(tag.to_string(), value)].into_iter().collect());
    serde_json::from_value(tagged).map(Some).map_err(D::Error::custom)
}

/// System information reported by a node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// CPU architecture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    /// Boot ID.
    #[serde(default, rename = "bootID", skip_serializing_if = "Option::is_none")]
    pub boot_id: Option<String>,
    /// Container runtime version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_runtime_version: Option<String>,
    /// Kernel version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
    /// Kube-proxy version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy_version: Option<String>,
    /// Kubelet version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubelet_version: Option<String>,
    /// Machine ID.
    #[serde(default, rename = "machineID", skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    /// Operating system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    /// OS image description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_image: Option<String>,
    /// System UUID.
    #[serde(default, rename = "systemUUID", skip_serializing_if = "Option::is_none")]
    pub system_uuid: Option<String>,
}

impl Record {
    /// Decodes a record from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the text is not a JSON object or a captured
    /// field has the wrong type.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::Decode)
    }

    /// Serializes the captured fields as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Decode)
    }

    /// The object name, if captured.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref()?.name.as_deref()
    }

    /// The object namespace, if captured.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.metadata.as_ref()?.namespace.as_deref()
    }
}

/// Decodes a matched listing item into a [`Record`].
///
/// # Errors
///
/// Returns [`Error::Decode`] if the candidate is not well-formed.
pub fn normalize(candidate: &Candidate) -> Result<Record> {
    Record::from_json(candidate.as_str())
}

/// Records found for one resource kind. Record order is unspecified.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultSet {
    /// Kind name of every record, e.g. `"Pod"`.
    pub kind: String,
    /// The normalized records.
    pub records: Vec<Record>,
}

/// One container of a pod, joined with its runtime status.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerView {
    /// Name of the owning pod.
    pub pod: Option<String>,
    /// Namespace of the owning pod.
    pub namespace: Option<String>,
    /// Container name.
    pub name: Option<String>,
    /// Image reference.
    pub image: Option<String>,
    /// Readiness, `false` when no status was reported.
    pub ready: bool,
    /// Restart count, `0` when no status was reported.
    pub restart_count: i32,
    /// Current state, if reported.
    pub state: Option<ContainerState>,
}

impl ResultSet {
    /// Creates an empty result set for `kind`.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            records: Vec::new(),
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flattens the containers of every pod in this set.
    ///
    /// Each declared container is paired with the status of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPods`] if this set does not hold pods.
    pub fn containers(&self) -> Result<Vec<ContainerView>> {
        if self.kind != "Pod" {
            return Err(Error::NotPods(self.kind.clone()));
        }

        let mut views = Vec::new();

        for record in &self.records {
            let statuses = record
                .status
                .as_ref()
                .map_or(&[][..], |s| s.container_statuses.as_slice());

            let containers = record
                .spec
                .as_ref()
                .map_or(&[][..], |s| s.containers.as_slice());

            for container in containers {
                let status = statuses
                    .iter()
                    .find(|s| s.name.is_some() && s.name == container.name);

                views.push(ContainerView {
                    pod: record.name().map(String::from),
                    namespace: record.namespace().map(String::from),
                    name: container.name.clone(),
                    image: container.image.clone(),
                    ready: status.is_some_and(|s| s.ready),
                    restart_count: status.map_or(0, |s| s.restart_count),
                    state: status.and_then(|s| s.state.clone()),
                });
            }
        }

        Ok(views)
    }
}
