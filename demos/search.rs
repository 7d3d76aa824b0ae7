//! Searches a cluster for resources by name and prints the normalized records.
//!
//! # Environment Variables
//!
//! - `RESOURCE_KIND`: kind to search, e.g. `pods` or `svc` (default: pods)
//! - `SEARCH_NAMES`: comma-separated names to look for (default: all)
//! - `SEARCH_NAMESPACE`: namespace to search (default: all namespaces)
//! - `EXACT_MATCH`: set to `true` to require exact names (default: substring)
//! - `KUBE_API_SERVER`: API server URL to use instead of kubeconfig/in-cluster

use std::env;

use kube_sift::{ClientSource, Error, ResourceClient, ResourceKind, SearchConfig};
use tracing::{Level, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    // Read configuration from environment
    let kind: ResourceKind = env::var("RESOURCE_KIND")
        .unwrap_or_else(|_| "pods".to_string())
        .parse()?;
    let names: Vec<String> = env::var("SEARCH_NAMES")
        .map(|n| n.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_else(|_| vec![String::new()]);
    let exact = env::var("EXACT_MATCH").is_ok_and(|v| v == "true");
    let source = env::var("KUBE_API_SERVER").map_or(ClientSource::Infer, ClientSource::ApiServer);

    let mut config = SearchConfig::new();
    if let Ok(namespace) = env::var("SEARCH_NAMESPACE") {
        config = config.namespace(namespace);
    }
    if exact {
        config = config.exact();
    }

    info!("Searching {kind} for {names:?}");

    let client = ResourceClient::connect(&source, config).await?;

    let found = match client.search_many(kind, &names).await {
        Ok(found) => found,
        Err(Error::Partial { partial, source }) => {
            warn!("some {kind} could not be decoded: {source}");
            partial
        }
        Err(e) => {
            error!("search failed: {e}");
            return Err(e.into());
        }
    };

    info!("Found {} {}", found.len(), found.kind);

    for record in &found.records {
        println!("{}", record.to_json()?);
    }

    Ok(())
}
