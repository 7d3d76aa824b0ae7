#![deny(missing_docs)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Name-based search and normalization over Kubernetes resource listings.
//!
//! This crate fetches every object of one resource kind in a single bulk list
//! request, picks out the objects whose name matches a query, and decodes them
//! into a uniform [`Record`] of common `metadata`, `spec` and `status` fields.
//! Decoding fans out over a bounded pool of blocking workers and fans back in,
//! keeping every success even when some documents fail.
//!
//! # Features
//!
//! - **Zero-copy matching**: matches are spans of the fetched listing, shared by all workers
//! - **Exact or substring search**: literal, case-sensitive name matching
//! - **Partial results**: decode failures are reported alongside the records that succeeded
//! - **Closed kind set**: pods, nodes, replica sets, deployments, services and ingresses
//!
//! # Usage
//!
//! ```ignore
//! use kube_sift::{ClientSource, Error, ResourceClient, ResourceKind, SearchConfig};
//!
//! let config = SearchConfig::new().namespace("default");
//! let client = ResourceClient::connect(&ClientSource::Infer, config).await?;
//!
//! match client.search_many(ResourceKind::Pods, &["web", "db"]).await {
//!     Ok(found) => println!("{} pods", found.len()),
//!     Err(Error::Partial { partial, source }) => {
//!         println!("{} pods, some failed: {source}", partial.len());
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```

mod client;
mod config;
mod error;
mod extract;
mod fanout;
mod kind;
mod record;

pub use client::{ResourceClient, ResourceRef, Transport};
pub use config::{ClientSource, DEFAULT_MAX_WORKERS, ErrorPolicy, MatchMode, SearchConfig};
pub use error::{BoxError, Error, Result};
pub use extract::{Candidate, MatchQuery, Projection, RawListing, extract};
pub use fanout::{FanOut, Gathered};
pub use kind::ResourceKind;
pub use record::{
    Container, ContainerState, ContainerStatus, ContainerView, Metadata, NodeInfo,
    OwnerReference, Port, Record, ResultSet, Spec, Status, normalize,
};
