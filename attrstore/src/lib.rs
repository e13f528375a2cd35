//! AttrStore - A client-side access layer for a remote attribute store.
//!
//! AttrStore wraps a remote, schema-less attribute service behind a typed
//! interface: domains hold items, and each item maps attribute names to sets
//! of string values. The layer adds retries with exponential backoff, lazy
//! token-driven pagination, and key-routed partitioning across several
//! domains, while keeping all state on the service.
//!
//! # Architecture
//!
//! Every request funnels through a [`PageFetcher`], the only component that
//! retries. Query results arrive as token-linked pages that are flattened
//! into pull-based streams: nothing is fetched until the consumer asks, and
//! dropping a stream is cancellation. A [`Partitions`] set spreads items
//! over a fixed list of domains with a deterministic [`Router`], batching
//! writes so each shard receives at most one call.
//!
//! # Key Concepts
//!
//! - **Domain**: one remote domain with reads, writes, and admin operations.
//! - **Partitions**: several domains presented as one logical store.
//! - **AttributeStore**: the trait both implement, so callers work
//!   unchanged over either.
//! - **Update**: a builder accumulating attribute changes for one item,
//!   consumed by a single write call.
//!
//! # Example
//!
//! ```ignore
//! use attrstore::{AttributeStore, Domain, Update};
//!
//! // Open a domain over a remote service handle
//! let users = Domain::new("users", api);
//! users.create().await?;
//!
//! // Write attribute values
//! users
//!     .put("user:123", Update::new().add("tags", "admin").set_value("name", "alice"))
//!     .await?;
//!
//! // Read one item back
//! let snapshot = users.get_attributes("user:123", None).await?;
//! assert_eq!(snapshot.first_value("name"), Some("alice"));
//!
//! // Query lazily: pages are fetched as the stream is pulled
//! let mut matches = users.select("`tags` = 'admin'", None);
//! while let Some(snapshot) = matches.next().await? {
//!     println!("{}", snapshot.name());
//! }
//! ```

mod batch;
mod config;
mod cursor;
mod domain;
mod error;
mod fetcher;
mod model;
mod paginate;
mod partitions;
mod router;
mod store;
mod update;

pub use batch::ShardWriteResult;
pub use config::{Config, RetryConfig};
pub use cursor::Cursor;
pub use domain::{list_domains, Domain};
pub use error::{Error, Result};
pub use fetcher::PageFetcher;
pub use model::{Item, ItemSnapshot};
pub use partitions::Partitions;
pub use router::{default_route, RouteFn, Router};
pub use store::{AttributeStore, NameStream, SnapshotStream};
pub use update::Update;
