//! Token-driven pagination over the remote service.
//!
//! A [`Paginator`] turns a sequence of bounded responses into a lazy page
//! cursor: the first page is fetched on the first `next` call, never at
//! construction, and each following page only when demanded. The request for
//! the next page is a deterministic function of the initial request and the
//! continuation token; a page without a token ends the sequence. The cursor
//! holds no lookahead and is not restartable — a fresh traversal re-issues
//! every request.

use async_trait::async_trait;

use common::{Request, Response};

use crate::cursor::{Cursor, IterCursor};
use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::model::ItemSnapshot;

/// A request whose results arrive as token-linked pages.
pub(crate) trait PageRequest: Send + Sync {
    /// The decoded content of one page.
    type Page: Send;

    /// Builds the wire request for the current position.
    fn to_request(&self) -> Request;

    /// Decodes one response into page content and continuation token.
    fn decode(&self, response: Response) -> Result<(Self::Page, Option<String>)>;

    /// Computes the request for the page after `token`.
    fn next(&self, token: String) -> Self;
}

/// Lazy page cursor over a [`PageRequest`].
pub(crate) struct Paginator<R> {
    fetcher: PageFetcher,
    request: Option<R>,
}

impl<R: PageRequest> Paginator<R> {
    pub(crate) fn new(fetcher: PageFetcher, request: R) -> Self {
        Self {
            fetcher,
            request: Some(request),
        }
    }
}

#[async_trait]
impl<R: PageRequest> Cursor for Paginator<R> {
    type Item = R::Page;

    async fn next(&mut self) -> Result<Option<R::Page>> {
        // Taking the request up front also terminates the stream on error:
        // once a pull fails, later pulls yield None instead of re-issuing.
        let Some(request) = self.request.take() else {
            return Ok(None);
        };
        let response = self.fetcher.execute(request.to_request()).await?;
        let (page, token) = request.decode(response)?;
        self.request = token.map(|t| request.next(t));
        Ok(Some(page))
    }
}

/// Query pages: one domain, an opaque expression, optional projection.
#[derive(Clone)]
pub(crate) struct SelectRequest {
    pub(crate) domain: String,
    pub(crate) expression: String,
    pub(crate) attributes: Option<Vec<String>>,
    pub(crate) next_token: Option<String>,
}

impl PageRequest for SelectRequest {
    type Page = IterCursor<ItemSnapshot>;

    fn to_request(&self) -> Request {
        Request::Select {
            domain: self.domain.clone(),
            expression: self.expression.clone(),
            attributes: self.attributes.clone(),
            next_token: self.next_token.clone(),
        }
    }

    fn decode(&self, response: Response) -> Result<(Self::Page, Option<String>)> {
        match response {
            Response::Select { items, next_token } => {
                let snapshots = items
                    .into_iter()
                    .map(|data| ItemSnapshot::from_data(&self.domain, data))
                    .collect();
                Ok((IterCursor::new(snapshots), next_token))
            }
            other => Err(Error::Internal(format!(
                "unexpected response to Select: {:?}",
                other
            ))),
        }
    }

    fn next(&self, token: String) -> Self {
        Self {
            next_token: Some(token),
            ..self.clone()
        }
    }
}

/// Domain-name pages for service-wide enumeration.
#[derive(Clone)]
pub(crate) struct ListDomainsRequest {
    pub(crate) max_domains: Option<usize>,
    pub(crate) next_token: Option<String>,
}

impl PageRequest for ListDomainsRequest {
    type Page = IterCursor<String>;

    fn to_request(&self) -> Request {
        Request::ListDomains {
            max_domains: self.max_domains,
            next_token: self.next_token.clone(),
        }
    }

    fn decode(&self, response: Response) -> Result<(Self::Page, Option<String>)> {
        match response {
            Response::DomainList {
                domains,
                next_token,
            } => Ok((IterCursor::new(domains), next_token)),
            other => Err(Error::Internal(format!(
                "unexpected response to ListDomains: {:?}",
                other
            ))),
        }
    }

    fn next(&self, token: String) -> Self {
        Self {
            next_token: Some(token),
            ..self.clone()
        }
    }
}
