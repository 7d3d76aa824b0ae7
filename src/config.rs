//! Search settings and cluster credential sources.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::error::{Error, Result};
use crate::extract::MatchQuery;

/// Default upper bound on concurrently running decode tasks.
pub const DEFAULT_MAX_WORKERS: NonZeroUsize = NonZeroUsize::new(16).unwrap();

/// How search names are compared against resource names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// The resource name contains the search text.
    #[default]
    Substring,
    /// The resource name equals the search text.
    Exact,
}

impl MatchMode {
    /// Builds the query for `name` in this mode.
    #[must_use]
    pub fn query(self, name: impl Into<String>) -> MatchQuery {
        match self {
            Self::Substring => MatchQuery::Substring(name.into()),
            Self::Exact => MatchQuery::Exact(name.into()),
        }
    }
}

/// Which error is reported when several concurrent tasks fail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Keep the most recently collected error.
    #[default]
    LastObserved,
    /// Keep the first collected error.
    FirstObserved,
}

/// Settings applied to every request made by a [`ResourceClient`](crate::ResourceClient).
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Namespace for namespaced kinds. If `None`, all namespaces are listed.
    pub namespace: Option<String>,

    /// How names are matched.
    pub match_mode: MatchMode,

    /// Options sent with every bulk list request (selectors, limit).
    pub list_params: ListParams,

    /// Upper bound on concurrently running search or decode tasks.
    pub max_workers: NonZeroUsize,

    /// Which error to report when several tasks fail.
    pub error_policy: ErrorPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            match_mode: MatchMode::default(),
            list_params: ListParams::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl SearchConfig {
    /// Creates the default configuration: all namespaces, substring matching.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts namespaced kinds to `namespace`.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the match mode.
    #[must_use]
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Matches names exactly.
    #[must_use]
    pub fn exact(self) -> Self {
        self.match_mode(MatchMode::Exact)
    }

    /// Sets the list options sent with every bulk request.
    #[must_use]
    pub fn list_params(mut self, params: ListParams) -> Self {
        self.list_params = params;
        self
    }

    /// Filters bulk listings by label selector.
    #[must_use]
    pub fn labels(mut self, selector: &str) -> Self {
        self.list_params = self.list_params.labels(selector);
        self
    }

    /// Filters bulk listings by field selector.
    #[must_use]
    pub fn fields(mut self, selector: &str) -> Self {
        self.list_params = self.list_params.fields(selector);
        self
    }

    /// Bounds the number of concurrently running tasks.
    #[must_use]
    pub fn max_workers(mut self, max_workers: NonZeroUsize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Sets which error is reported when several tasks fail.
    #[must_use]
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}

/// Where cluster credentials come from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ClientSource {
    /// Kubeconfig if available, otherwise the in-cluster service account.
    #[default]
    Infer,

    /// The in-cluster service account.
    InCluster,

    /// A kubeconfig file.
    Kubeconfig {
        /// Path to the file. If `None`, `$KUBECONFIG` or `~/.kube/config` is read.
        path: Option<PathBuf>,
        /// Context to use. If `None`, the current context.
        context: Option<String>,
    },

    /// A manually supplied API server URL, without authentication.
    ApiServer(String),
}

impl ClientSource {
    /// Resolves this source into a client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the source cannot be read or is invalid.
    pub async fn config(&self) -> Result<Config> {
        match self {
            Self::Infer => Config::infer().await.map_err(Error::config),
            Self::InCluster => Config::incluster().map_err(Error::config),
            Self::Kubeconfig { path, context } => {
                let kubeconfig = match path {
                    Some(path) => Kubeconfig::read_from(path),
                    None => Kubeconfig::read(),
                }
                .map_err(Error::config)?;

                let options = KubeConfigOptions {
                    context: context.clone(),
                    ..KubeConfigOptions::default()
                };

                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(Error::config)
            }
            Self::ApiServer(url) => {
                let uri = url.parse::<http::Uri>().map_err(Error::config)?;
                Ok(Config::new(uri))
            }
        }
    }

    /// Builds a ready-to-use client from this source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no valid configuration can be built.
    pub async fn client(&self) -> Result<Client> {
        let config = self.config().await?;
        tracing::debug!("connecting to cluster at {}", config.cluster_url);
        Client::try_from(config).map_err(Error::config)
    }
}
