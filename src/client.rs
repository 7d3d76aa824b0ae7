//! Bulk listing and name search against the control plane.
//!
//! # How It Works
//!
//! 1. One bulk list request fetches every object of a kind as raw JSON
//! 2. The listing is matched by name without decoding the items
//! 3. Matches are decoded into [`Record`]s on a bounded pool of blocking workers
//! 4. Results are gathered in completion order; decode failures do not stop
//!    the remaining work
//!
//! # Example
//!
//! ```ignore
//! use kube_sift::{ClientSource, ResourceClient, ResourceKind, SearchConfig};
//!
//! let client = ResourceClient::connect(&ClientSource::Infer, SearchConfig::new()).await?;
//! let pods = client.search(ResourceKind::Pods, "web").await?;
//! for record in &pods.records {
//!     println!("{:?}", record.name());
//! }
//! ```

use futures::FutureExt;
use futures::future::BoxFuture;
use kube::api::ListParams;
use kube::core::Request;
use kube::Client;
use serde::Serialize;

use crate::config::{ClientSource, MatchMode, SearchConfig};
use crate::error::{Error, Result};
use crate::extract::{self, Candidate, MatchQuery, Projection, RawListing};
use crate::fanout::{FanOut, Gathered};
use crate::kind::ResourceKind;
use crate::record::{self, Record, ResultSet};

/// Issues bulk list requests to the control plane.
///
/// Implemented for [`kube::Client`]; other implementations can serve listings
/// from elsewhere.
pub trait Transport: Send + Sync {
    /// Lists every object of `kind` and returns the response body unmodified.
    ///
    /// `namespace` is `None` for cluster-scoped kinds or when listing across
    /// all namespaces.
    fn list<'a>(
        &'a self,
        kind: ResourceKind,
        namespace: Option<&'a str>,
        params: &'a ListParams,
    ) -> BoxFuture<'a, std::result::Result<String, kube::Error>>;
}

impl Transport for Client {
    fn list<'a>(
        &'a self,
        kind: ResourceKind,
        namespace: Option<&'a str>,
        params: &'a ListParams,
    ) -> BoxFuture<'a, std::result::Result<String, kube::Error>> {
        async move {
            let request = Request::new(kind.url_path(namespace))
                .list(params)
                .map_err(kube::Error::BuildRequest)?;

            self.request_text(request).await
        }
        .boxed()
    }
}

/// A resource located by [`ResourceClient::list_resources`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    /// Object name.
    pub name: String,
    /// Namespace, `None` for cluster-scoped objects.
    pub namespace: Option<String>,
    /// Kind name, e.g. `"Pod"`.
    pub kind: &'static str,
    /// The object's self-link, or its canonical path when the server omits one.
    pub url: String,
}

/// Searches resources by name within one cluster.
///
/// The namespace and match mode may be changed between calls. Calls borrow the
/// client immutably, so reconfiguring while a search is in flight is ruled out
/// by the borrow checker.
#[derive(Clone, Debug)]
pub struct ResourceClient<T = Client> {
    transport: T,
    config: SearchConfig,
}

impl ResourceClient<Client> {
    /// Connects to the cluster described by `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no usable configuration is found.
    pub async fn connect(source: &ClientSource, config: SearchConfig) -> Result<Self> {
        let client = source.client().await?;
        Ok(Self::new(client, config))
    }
}

impl<T: Transport> ResourceClient<T> {
    /// Creates a client over an existing transport.
    #[must_use]
    pub fn new(transport: T, config: SearchConfig) -> Self {
        Self { transport, config }
    }

    /// The current settings.
    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sets the namespace for namespaced kinds; `None` lists all namespaces.
    pub fn set_namespace(&mut self, namespace: Option<String>) {
        self.config.namespace = namespace;
    }

    /// Sets how names are matched.
    pub fn set_match_mode(&mut self, mode: MatchMode) {
        self.config.match_mode = mode;
    }

    fn fan_out(&self) -> FanOut {
        FanOut::new(self.config.max_workers, self.config.error_policy)
    }

    fn query(&self, name: &str) -> MatchQuery {
        self.config.match_mode.query(name)
    }

    /// Fetches every object of `kind` as one raw listing.
    ///
    /// Cluster-scoped kinds ignore the configured namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the request fails.
    pub async fn fetch_all(&self, kind: ResourceKind) -> Result<RawListing> {
        let namespace = self
            .config
            .namespace
            .as_deref()
            .filter(|_| kind.is_namespaced());

        let body = self
            .transport
            .list(kind, namespace, &self.config.list_params)
            .await?;

        tracing::debug!(
            %kind,
            namespace = namespace.unwrap_or("*"),
            bytes = body.len(),
            "fetched bulk listing"
        );

        Ok(RawListing::from(body))
    }

    /// Returns the objects of `kind` whose name matches `name`, normalized.
    ///
    /// Matching follows the configured [`MatchMode`]. No match is an empty
    /// result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] or [`Error::Listing`] if the listing cannot
    /// be fetched or read. If any match fails to decode, returns
    /// [`Error::Partial`] holding the records that did decode.
    pub async fn search(&self, kind: ResourceKind, name: &str) -> Result<ResultSet> {
        let listing = self.fetch_all(kind).await?;
        let candidates = extract::extract(&listing, &self.query(name), Projection::WholeDocument)?;

        let gathered = self
            .fan_out()
            .run(candidates, |candidate: Candidate| record::normalize(&candidate))
            .await;

        finish(kind, gathered, |records| records)
    }

    /// Like [`search`](Self::search) for several names over a single listing.
    ///
    /// Each name is matched and decoded as one task; a record matching more
    /// than one name appears once per name. A name whose matches fail to
    /// decode contributes no records.
    ///
    /// # Errors
    ///
    /// As for [`search`](Self::search).
    pub async fn search_many<S: AsRef<str>>(
        &self,
        kind: ResourceKind,
        names: &[S],
    ) -> Result<ResultSet> {
        let listing = self.fetch_all(kind).await?;
        extract::validate(&listing)?;

        let queries: Vec<MatchQuery> = names.iter().map(|n| self.query(n.as_ref())).collect();

        let gathered = self
            .fan_out()
            .run(queries, move |query: MatchQuery| {
                extract::extract(&listing, &query, Projection::WholeDocument)?
                    .iter()
                    .map(record::normalize)
                    .collect::<Result<Vec<Record>>>()
            })
            .await;

        finish(kind, gathered, |per_name| {
            per_name.into_iter().flatten().collect()
        })
    }

    /// Returns the raw JSON of each matching object, undecoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] or [`Error::Listing`] if the listing cannot
    /// be fetched or read.
    pub async fn search_raw(&self, kind: ResourceKind, name: &str) -> Result<Vec<String>> {
        let listing = self.fetch_all(kind).await?;
        let candidates = extract::extract(&listing, &self.query(name), Projection::WholeDocument)?;

        Ok(candidates
            .iter()
            .map(|c| c.as_str().to_string())
            .collect())
    }

    /// Returns the self-links of matching objects, without decoding them.
    ///
    /// Objects for which the server reports no self-link are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] or [`Error::Listing`] if the listing cannot
    /// be fetched or read, and [`Error::Decode`] if a self-link is not a string.
    pub async fn find_links(&self, kind: ResourceKind, name: &str) -> Result<Vec<String>> {
        let listing = self.fetch_all(kind).await?;

        extract::extract(&listing, &self.query(name), Projection::SelfLinkOnly)?
            .iter()
            .map(|c| serde_json::from_str::<String>(c.as_str()).map_err(Error::Decode))
            .collect()
    }

    /// Returns the self-links of every object of `kind`.
    ///
    /// # Errors
    ///
    /// As for [`find_links`](Self::find_links).
    pub async fn all_links(&self, kind: ResourceKind) -> Result<Vec<String>> {
        let listing = self.fetch_all(kind).await?;

        extract::extract(&listing, &MatchQuery::Substring(String::new()), Projection::SelfLinkOnly)?
            .iter()
            .map(|c| serde_json::from_str::<String>(c.as_str()).map_err(Error::Decode))
            .collect()
    }

    /// Lists every object of `kind` as name, namespace, kind and URL.
    ///
    /// When the server omits `metadata.selfLink`, the URL is the object's
    /// canonical API path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] or [`Error::Listing`] if the listing cannot
    /// be fetched or read, and [`Error::Decode`] if a self-link is not a string.
    pub async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<ResourceRef>> {
        let listing = self.fetch_all(kind).await?;

        extract::entries(&listing)?
            .into_iter()
            .map(|entry| {
                let namespace = entry.namespace();
                let url = match entry.self_link()? {
                    Some(link) => link,
                    None => kind.object_path(namespace.as_deref(), &entry.name),
                };

                Ok(ResourceRef {
                    name: entry.name.into_owned(),
                    namespace,
                    kind: kind.kind(),
                    url,
                })
            })
            .collect()
    }
}

/// Builds the result set for `kind`, attaching any collected error.
fn finish<T>(
    kind: ResourceKind,
    gathered: Gathered<T, Error>,
    flatten: impl FnOnce(Vec<T>) -> Vec<Record>,
) -> Result<ResultSet> {
    let Gathered {
        outputs,
        error,
        failures,
    } = gathered;

    let result = ResultSet {
        kind: kind.kind().to_string(),
        records: flatten(outputs),
    };

    tracing::debug!(
        %kind,
        records = result.records.len(),
        failures,
        "search finished"
    );

    match error {
        None => Ok(result),
        Some(source) => Err(Error::Partial {
            partial: result,
            source: Box::new(source),
        }),
    }
}
