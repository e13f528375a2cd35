//! The store interface shared by single domains and partitioned sets.

use async_trait::async_trait;

use common::{AttributeOp, PutCondition};

use crate::batch::ShardWriteResult;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::model::ItemSnapshot;
use crate::update::Update;

/// A lazy stream of item snapshots.
///
/// Construction performs no requests; the consumer's `next` call is the only
/// trigger for fetching. An error terminates the stream, and later pulls
/// yield `None`.
pub struct SnapshotStream {
    inner: Box<dyn Cursor<Item = ItemSnapshot> + Send>,
}

impl SnapshotStream {
    pub(crate) fn new(inner: impl Cursor<Item = ItemSnapshot> + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Returns the next snapshot, or `None` when the stream is exhausted.
    pub async fn next(&mut self) -> Result<Option<ItemSnapshot>> {
        self.inner.next().await
    }

    /// Drains the stream into a vector, fetching every remaining page.
    pub async fn collect(mut self) -> Result<Vec<ItemSnapshot>> {
        let mut snapshots = Vec::new();
        while let Some(snapshot) = self.next().await? {
            snapshots.push(snapshot);
        }
        Ok(snapshots)
    }
}

#[async_trait]
impl Cursor for SnapshotStream {
    type Item = ItemSnapshot;

    async fn next(&mut self) -> Result<Option<ItemSnapshot>> {
        SnapshotStream::next(self).await
    }
}

/// A lazy stream of names, with the same pull semantics as
/// [`SnapshotStream`].
pub struct NameStream {
    inner: Box<dyn Cursor<Item = String> + Send>,
}

impl NameStream {
    pub(crate) fn new(inner: impl Cursor<Item = String> + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Returns the next name, or `None` when the stream is exhausted.
    pub async fn next(&mut self) -> Result<Option<String>> {
        self.inner.next().await
    }

    /// Drains the stream into a vector.
    pub async fn collect(mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        while let Some(name) = self.next().await? {
            names.push(name);
        }
        Ok(names)
    }
}

#[async_trait]
impl Cursor for NameStream {
    type Item = String;

    async fn next(&mut self) -> Result<Option<String>> {
        NameStream::next(self).await
    }
}

/// Read and write operations over an attribute store.
///
/// Implemented by [`Domain`](crate::Domain) for a single domain and by
/// [`Partitions`](crate::Partitions) for a routed set of domains, so callers
/// written against this trait work unchanged over either.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Queries items matching `expression`, optionally projecting to the
    /// named attributes.
    ///
    /// The expression is passed to the service verbatim. Returns a lazy
    /// stream; no request is issued until the first pull.
    fn select(&self, expression: &str, attributes: Option<&[&str]>) -> SnapshotStream;

    /// Enumerates the names of every item, lazily.
    fn item_names(&self) -> NameStream;

    /// Reads one item's attributes, optionally projected.
    ///
    /// A missing item yields an empty snapshot, never an error.
    async fn get_attributes(&self, item: &str, attributes: Option<&[&str]>)
        -> Result<ItemSnapshot>;

    /// Applies `update` to one item. An empty update issues no request.
    async fn put(&self, item: &str, update: Update) -> Result<()>;

    /// Applies `update` only when `condition` holds on the stored item.
    async fn put_if(&self, item: &str, update: Update, condition: PutCondition) -> Result<()>;

    /// Deletes the named attributes from one item, or the whole item when
    /// `attributes` is `None`.
    async fn delete_attributes(&self, item: &str, attributes: Option<&[&str]>) -> Result<()>;

    /// Applies item-addressed operations as one batched write per shard,
    /// returning the outcome of each shard's write.
    async fn batch_write(&self, operations: Vec<AttributeOp>) -> Vec<ShardWriteResult>;
}
