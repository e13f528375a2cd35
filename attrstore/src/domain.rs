//! Access to a single remote domain.

use std::sync::Arc;

use async_trait::async_trait;

use common::{AttributeOp, DomainMetadata, PutCondition, RemoteApi, Request, Response};

use crate::batch::{BatchCoordinator, ShardWriteResult};
use crate::config::Config;
use crate::cursor::{Flatten, Map};
use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::model::{Item, ItemSnapshot};
use crate::paginate::{ListDomainsRequest, Paginator, SelectRequest};
use crate::router::Router;
use crate::store::{AttributeStore, NameStream, SnapshotStream};
use crate::update::Update;

/// One domain of the remote store.
///
/// A `Domain` is cheap to construct and holds no caches; all state lives on
/// the service. Requests go through a [`PageFetcher`], so every operation
/// inherits its retry behavior.
pub struct Domain {
    name: String,
    fetcher: PageFetcher,
}

impl Domain {
    /// Opens `name` over `api` with the default configuration.
    pub fn new(name: impl Into<String>, api: Arc<dyn RemoteApi>) -> Self {
        Self::with_config(name, api, Config::default())
    }

    /// Opens `name` over `api` with an explicit configuration.
    pub fn with_config(name: impl Into<String>, api: Arc<dyn RemoteApi>, config: Config) -> Self {
        Self::from_fetcher(name, PageFetcher::new(api, config.retry))
    }

    /// Opens `name` sharing an already-built fetcher.
    pub(crate) fn from_fetcher(name: impl Into<String>, fetcher: PageFetcher) -> Self {
        Self {
            name: name.into(),
            fetcher,
        }
    }

    /// The domain's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A reference to the named item within this domain.
    pub fn item(&self, name: impl Into<String>) -> Item {
        Item::new(self.name.clone(), name)
    }

    /// Creates the domain on the service. Creating an existing domain
    /// succeeds without effect.
    pub async fn create(&self) -> Result<()> {
        let response = self
            .fetcher
            .execute(Request::CreateDomain {
                domain: self.name.clone(),
            })
            .await?;
        expect_written(response)
    }

    /// Deletes the domain and everything in it.
    pub async fn delete(&self) -> Result<()> {
        let response = self
            .fetcher
            .execute(Request::DeleteDomain {
                domain: self.name.clone(),
            })
            .await?;
        expect_written(response)
    }

    /// Fetches the domain's statistics.
    pub async fn metadata(&self) -> Result<DomainMetadata> {
        let response = self
            .fetcher
            .execute(Request::DomainMetadata {
                domain: self.name.clone(),
            })
            .await?;
        match response {
            Response::Metadata(metadata) => Ok(metadata),
            other => Err(unexpected("DomainMetadata", other)),
        }
    }

    fn select_request(&self, expression: &str, attributes: Option<&[&str]>) -> SelectRequest {
        SelectRequest {
            domain: self.name.clone(),
            expression: expression.to_string(),
            attributes: attributes.map(|names| names.iter().map(|n| n.to_string()).collect()),
            next_token: None,
        }
    }
}

#[async_trait]
impl AttributeStore for Domain {
    #[tracing::instrument(level = "trace", skip_all)]
    fn select(&self, expression: &str, attributes: Option<&[&str]>) -> SnapshotStream {
        let pages = Paginator::new(
            self.fetcher.clone(),
            self.select_request(expression, attributes),
        );
        SnapshotStream::new(Flatten::new(pages))
    }

    fn item_names(&self) -> NameStream {
        // Empty projection: the service returns names without pairs.
        let pages = Paginator::new(self.fetcher.clone(), self.select_request("", Some(&[])));
        NameStream::new(Map::new(Flatten::new(pages), |snapshot: ItemSnapshot| {
            snapshot.into_item().name
        }))
    }

    async fn get_attributes(
        &self,
        item: &str,
        attributes: Option<&[&str]>,
    ) -> Result<ItemSnapshot> {
        let response = self
            .fetcher
            .execute(Request::GetAttributes {
                domain: self.name.clone(),
                item: item.to_string(),
                attributes: attributes.map(|names| names.iter().map(|n| n.to_string()).collect()),
            })
            .await?;
        match response {
            Response::Attributes { pairs } => Ok(ItemSnapshot::new(self.item(item), pairs)),
            other => Err(unexpected("GetAttributes", other)),
        }
    }

    async fn put(&self, item: &str, update: Update) -> Result<()> {
        self.put_if(item, update, PutCondition::None).await
    }

    async fn put_if(&self, item: &str, update: Update, condition: PutCondition) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let response = self
            .fetcher
            .execute(Request::PutAttributes {
                domain: self.name.clone(),
                item: item.to_string(),
                updates: update.into_updates(),
                condition,
            })
            .await?;
        expect_written(response)
    }

    async fn delete_attributes(&self, item: &str, attributes: Option<&[&str]>) -> Result<()> {
        let response = self
            .fetcher
            .execute(Request::DeleteAttributes {
                domain: self.name.clone(),
                item: item.to_string(),
                attributes: attributes.map(|names| names.iter().map(|n| n.to_string()).collect()),
            })
            .await?;
        expect_written(response)
    }

    async fn batch_write(&self, operations: Vec<AttributeOp>) -> Vec<ShardWriteResult> {
        let router = Router::new();
        let domains = std::slice::from_ref(&self.name);
        BatchCoordinator::new(&self.fetcher, domains, &router)
            .apply(operations)
            .await
    }
}

/// Lazily enumerates every domain on the service.
pub fn list_domains(api: Arc<dyn RemoteApi>, config: Config) -> NameStream {
    let pages = Paginator::new(
        PageFetcher::new(api, config.retry),
        ListDomainsRequest {
            max_domains: None,
            next_token: None,
        },
    );
    NameStream::new(Flatten::new(pages))
}

fn expect_written(response: Response) -> Result<()> {
    match response {
        Response::Written => Ok(()),
        other => Err(unexpected("write", other)),
    }
}

fn unexpected(operation: &str, response: Response) -> Error {
    Error::Internal(format!(
        "unexpected response to {}: {:?}",
        operation, response
    ))
}
