//! The closed set of resource kinds that can be listed and searched.

use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;

use crate::error::Error;

/// A resource kind supported by bulk listing and name search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `core/v1` pods.
    Pods,
    /// `core/v1` nodes (cluster-scoped).
    Nodes,
    /// `apps/v1` replica sets.
    ReplicaSets,
    /// `apps/v1` deployments.
    Deployments,
    /// `core/v1` services.
    Services,
    /// `networking.k8s.io/v1` ingresses.
    Ingresses,
}

/// Static description of a kind: naming, scope and how to build its list path.
struct KindInfo {
    kind: &'static str,
    plural: &'static str,
    aliases: &'static [&'static str],
    namespaced: bool,
    url_path: fn(Option<&str>) -> String,
}

fn url_path<K>(namespace: Option<&str>) -> String
where
    K: kube::Resource<DynamicType = ()>,
{
    K::url_path(&(), namespace)
}

const PODS: KindInfo = KindInfo {
    kind: <Pod as k8s_openapi::Resource>::KIND,
    plural: <Pod as k8s_openapi::Resource>::URL_PATH_SEGMENT,
    aliases: &["pod", "po"],
    namespaced: true,
    url_path: url_path::<Pod>,
};

const NODES: KindInfo = KindInfo {
    kind: <Node as k8s_openapi::Resource>::KIND,
    plural: <Node as k8s_openapi::Resource>::URL_PATH_SEGMENT,
    aliases: &["node", "no"],
    namespaced: false,
    url_path: url_path::<Node>,
};

const REPLICA_SETS: KindInfo = KindInfo {
    kind: <ReplicaSet as k8s_openapi::Resource>::KIND,
    plural: <ReplicaSet as k8s_openapi::Resource>::URL_PATH_SEGMENT,
    aliases: &["replicaset", "rs"],
    namespaced: true,
    url_path: url_path::<ReplicaSet>,
};

const DEPLOYMENTS: KindInfo = KindInfo {
    kind: <Deployment as k8s_openapi::Resource>::KIND,
    plural: <Deployment as k8s_openapi::Resource>::URL_PATH_SEGMENT,
    aliases: &["deployment", "deploy", "deploys"],
    namespaced: true,
    url_path: url_path::<Deployment>,
};

const SERVICES: KindInfo = KindInfo {
    kind: <Service as k8s_openapi::Resource>::KIND,
    plural: <Service as k8s_openapi::Resource>::URL_PATH_SEGMENT,
    aliases: &["service", "svc"],
    namespaced: true,
    url_path: url_path::<Service>,
};

const INGRESSES: KindInfo = KindInfo {
    kind: <Ingress as k8s_openapi::Resource>::KIND,
    plural: <Ingress as k8s_openapi::Resource>::URL_PATH_SEGMENT,
    aliases: &["ingress", "ing"],
    namespaced: true,
    url_path: url_path::<Ingress>,
};

impl ResourceKind {
    /// Every supported kind, in listing order.
    pub const ALL: [Self; 6] = [
        Self::Pods,
        Self::Nodes,
        Self::ReplicaSets,
        Self::Deployments,
        Self::Services,
        Self::Ingresses,
    ];

    fn info(self) -> &'static KindInfo {
        match self {
            Self::Pods => &PODS,
            Self::Nodes => &NODES,
            Self::ReplicaSets => &REPLICA_SETS,
            Self::Deployments => &DEPLOYMENTS,
            Self::Services => &SERVICES,
            Self::Ingresses => &INGRESSES,
        }
    }

    /// The `Kind` name reported in result sets, e.g. `"Pod"`.
    #[must_use]
    pub fn kind(self) -> &'static str {
        self.info().kind
    }

    /// The plural path segment, e.g. `"pods"`.
    #[must_use]
    pub fn plural(self) -> &'static str {
        self.info().plural
    }

    /// Whether objects of this kind live inside a namespace.
    #[must_use]
    pub fn is_namespaced(self) -> bool {
        self.info().namespaced
    }

    /// The list path for this kind.
    ///
    /// The namespace is ignored for cluster-scoped kinds.
    #[must_use]
    pub fn url_path(self, namespace: Option<&str>) -> String {
        let namespace = namespace.filter(|_| self.is_namespaced());
        (self.info().url_path)(namespace)
    }

    /// The canonical path of a single named object of this kind.
    #[must_use]
    pub fn object_path(self, namespace: Option<&str>, name: &str) -> String {
        format!("{}/{name}", self.url_path(namespace))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    /// Parses a plural name (`"pods"`), singular name (`"pod"`) or short name (`"po"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| {
                let info = kind.info();
                info.plural == wanted || info.aliases.contains(&wanted.as_str())
            })
            .ok_or_else(|| Error::UnsupportedKind(s.to_string()))
    }
}
