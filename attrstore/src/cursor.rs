//! Pull-based cursors over remote results.
//!
//! Everything that produces a sequence in this crate is a [`Cursor`]: a
//! consumer's `next` call is the sole trigger for work, so a stream that is
//! never pulled issues no requests, and dropping a cursor is cancellation.

use async_trait::async_trait;

use crate::error::Result;

/// A pull-based asynchronous cursor over fallible elements.
#[async_trait]
pub trait Cursor: Send {
    type Item: Send;

    /// Returns the next element, or `None` when the cursor is exhausted.
    async fn next(&mut self) -> Result<Option<Self::Item>>;
}

/// Adapts an already-materialized collection into an infallible [`Cursor`].
///
/// Used for fetched pages and for prepared lists of per-shard streams.
pub(crate) struct IterCursor<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> IterCursor<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

#[async_trait]
impl<T: Send> Cursor for IterCursor<T> {
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>> {
        Ok(self.items.next())
    }
}

/// Flattens a cursor of cursors into one cursor, preserving order.
///
/// All elements of the first inner cursor precede all elements of the
/// second, and so on. A new outer element is pulled only once the current
/// inner cursor is exhausted, so inner sequences the consumer never reaches
/// are never materialized.
pub(crate) struct Flatten<Outer, Inner> {
    outer: Outer,
    inner: Option<Inner>,
}

impl<Outer, Inner> Flatten<Outer, Inner> {
    pub(crate) fn new(outer: Outer) -> Self {
        Self { outer, inner: None }
    }
}

#[async_trait]
impl<Outer, Inner> Cursor for Flatten<Outer, Inner>
where
    Outer: Cursor<Item = Inner>,
    Inner: Cursor,
{
    type Item = Inner::Item;

    async fn next(&mut self) -> Result<Option<Self::Item>> {
        loop {
            if let Some(inner) = self.inner.as_mut() {
                if let Some(item) = inner.next().await? {
                    return Ok(Some(item));
                }
                self.inner = None;
            }
            match self.outer.next().await? {
                Some(inner) => self.inner = Some(inner),
                None => return Ok(None),
            }
        }
    }
}

/// Applies a function to every element of an inner cursor.
pub(crate) struct Map<C, F> {
    inner: C,
    f: F,
}

impl<C, F> Map<C, F> {
    pub(crate) fn new(inner: C, f: F) -> Self {
        Self { inner, f }
    }
}

#[async_trait]
impl<C, F, T> Cursor for Map<C, F>
where
    C: Cursor,
    F: FnMut(C::Item) -> T + Send,
    T: Send,
{
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>> {
        Ok(self.inner.next().await?.map(&mut self.f))
    }
}
