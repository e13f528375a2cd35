//! A set of domains acting as shards of one logical store.

use std::sync::Arc;

use async_trait::async_trait;

use common::{AttributeOp, PutCondition, RemoteApi};

use crate::batch::{BatchCoordinator, ShardWriteResult};
use crate::config::Config;
use crate::cursor::{Flatten, IterCursor};
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::model::ItemSnapshot;
use crate::router::Router;
use crate::store::{AttributeStore, NameStream, SnapshotStream};
use crate::update::Update;

/// Several underlying domains presented as one logical store.
///
/// Shard order is the sorted, deduplicated list of domain names fixed at
/// construction; the [`Router`] maps each item key onto that list. Item
/// placement is stable only while the shard set is: changing the set of
/// names re-routes keys, so an existing deployment must keep its original
/// list.
///
/// Reads that span shards visit them in shard order, exhausting each shard
/// before touching the next, and stay as lazy as a single-domain read.
pub struct Partitions {
    domains: Vec<Domain>,
    names: Vec<String>,
    router: Router,
    fetcher: PageFetcher,
}

impl Partitions {
    /// Opens the named shard set over `api` with the default configuration
    /// and routing policy.
    pub fn new(
        names: impl IntoIterator<Item = impl Into<String>>,
        api: Arc<dyn RemoteApi>,
    ) -> Result<Self> {
        Self::with_router(names, api, Config::default(), Router::new())
    }

    /// Opens the shard set with an explicit configuration.
    pub fn with_config(
        names: impl IntoIterator<Item = impl Into<String>>,
        api: Arc<dyn RemoteApi>,
        config: Config,
    ) -> Result<Self> {
        Self::with_router(names, api, config, Router::new())
    }

    /// Opens the shard set with a caller-supplied routing policy.
    pub fn with_router(
        names: impl IntoIterator<Item = impl Into<String>>,
        api: Arc<dyn RemoteApi>,
        config: Config,
        router: Router,
    ) -> Result<Self> {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Err(Error::InvalidInput(
                "a partitioned store needs at least one domain".to_string(),
            ));
        }

        let fetcher = PageFetcher::new(api, config.retry);
        let domains = names
            .iter()
            .map(|name| Domain::from_fetcher(name.clone(), fetcher.clone()))
            .collect();
        Ok(Self {
            domains,
            names,
            router,
            fetcher,
        })
    }

    /// The shard names in routing order.
    pub fn shard_names(&self) -> &[String] {
        &self.names
    }

    /// The shard holding `key`.
    pub fn route(&self, key: &str) -> &Domain {
        &self.domains[self.router.route(key, self.domains.len())]
    }

    /// Creates every underlying domain.
    pub async fn create_all(&self) -> Result<()> {
        for domain in &self.domains {
            domain.create().await?;
        }
        Ok(())
    }

    /// Deletes every underlying domain.
    pub async fn delete_all(&self) -> Result<()> {
        for domain in &self.domains {
            domain.delete().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AttributeStore for Partitions {
    fn select(&self, expression: &str, attributes: Option<&[&str]>) -> SnapshotStream {
        let shards: Vec<SnapshotStream> = self
            .domains
            .iter()
            .map(|domain| domain.select(expression, attributes))
            .collect();
        SnapshotStream::new(Flatten::new(IterCursor::new(shards)))
    }

    fn item_names(&self) -> NameStream {
        let shards: Vec<NameStream> = self
            .domains
            .iter()
            .map(|domain| domain.item_names())
            .collect();
        NameStream::new(Flatten::new(IterCursor::new(shards)))
    }

    async fn get_attributes(
        &self,
        item: &str,
        attributes: Option<&[&str]>,
    ) -> Result<ItemSnapshot> {
        self.route(item).get_attributes(item, attributes).await
    }

    async fn put(&self, item: &str, update: Update) -> Result<()> {
        self.route(item).put(item, update).await
    }

    async fn put_if(&self, item: &str, update: Update, condition: PutCondition) -> Result<()> {
        self.route(item).put_if(item, update, condition).await
    }

    async fn delete_attributes(&self, item: &str, attributes: Option<&[&str]>) -> Result<()> {
        self.route(item).delete_attributes(item, attributes).await
    }

    async fn batch_write(&self, operations: Vec<AttributeOp>) -> Vec<ShardWriteResult> {
        BatchCoordinator::new(&self.fetcher, &self.names, &self.router)
            .apply(operations)
            .await
    }
}

#[cfg(test)]
mod tests {
    use common::InMemoryService;

    use super::*;

    /// Routes by the digit at the end of the item name.
    fn digit_router() -> Router {
        Router::with_fn(Arc::new(|key: &str, count: usize| {
            key.chars()
                .last()
                .and_then(|c| c.to_digit(10))
                .unwrap_or(0) as usize
                % count
        }))
    }

    async fn open_partitions(names: &[&str]) -> (Arc<InMemoryService>, Partitions) {
        let service = Arc::new(InMemoryService::new());
        let partitions = Partitions::with_router(
            names.iter().copied(),
            service.clone(),
            Config::default(),
            digit_router(),
        )
        .unwrap();
        partitions.create_all().await.unwrap();
        (service, partitions)
    }

    #[tokio::test]
    async fn should_reject_empty_shard_set() {
        // given
        let service = Arc::new(InMemoryService::new());

        // when
        let result = Partitions::new(Vec::<String>::new(), service);

        // then
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_sort_and_dedup_shard_names() {
        // given
        let service = Arc::new(InMemoryService::new());

        // when
        let partitions = Partitions::new(["d1", "d0", "d1"], service).unwrap();

        // then - fixed routing order regardless of input order
        assert_eq!(partitions.shard_names(), ["d0", "d1"]);
    }

    #[tokio::test]
    async fn should_keep_an_item_on_one_shard_across_writes() {
        // given
        let (_, partitions) = open_partitions(&["d0", "d1"]).await;

        // when - two writes to the same item
        partitions
            .put("k1", Update::new().add("tags", "x"))
            .await
            .unwrap();
        partitions
            .put("k1", Update::new().add("tags", "y"))
            .await
            .unwrap();

        // then - both landed on the routed shard and nothing elsewhere
        let routed = partitions.route("k1");
        assert_eq!(routed.name(), "d1");
        let snapshot = routed.get_attributes("k1", None).await.unwrap();
        let tags: Vec<&str> = snapshot.values("tags").collect();
        assert_eq!(tags, vec!["x", "y"]);
        assert!(partitions
            .route("k0")
            .get_attributes("k1", None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn should_read_through_the_same_route_as_writes() {
        // given
        let (_, partitions) = open_partitions(&["d0", "d1", "d2"]).await;
        partitions
            .put("k2", Update::new().set_value("state", "open"))
            .await
            .unwrap();

        // when
        let snapshot = partitions.get_attributes("k2", None).await.unwrap();

        // then
        assert_eq!(snapshot.first_value("state"), Some("open"));
    }

    #[tokio::test]
    async fn should_select_across_shards_in_shard_order() {
        // given - items spread over both shards
        let (_, partitions) = open_partitions(&["d0", "d1"]).await;
        for item in ["b1", "a0", "c1", "d0"] {
            partitions
                .put(item, Update::new().add("n", item))
                .await
                .unwrap();
        }

        // when
        let names = partitions.item_names().collect().await.unwrap();

        // then - shard d0's items precede shard d1's, each in server order
        assert_eq!(names, vec!["a0", "d0", "b1", "c1"]);
    }

    #[tokio::test]
    async fn should_not_fetch_cross_shard_select_until_pulled() {
        // given
        let (service, partitions) = open_partitions(&["d0", "d1"]).await;
        partitions
            .put("k0", Update::new().add("n", "1"))
            .await
            .unwrap();
        let before = service.issued();

        // when
        let mut stream = partitions.select("", None);

        // then - construction issued nothing
        assert_eq!(service.issued(), before);

        // when - the first pull fetches only the first shard's page
        stream.next().await.unwrap();
        assert_eq!(service.issued(), before + 1);
    }

    #[tokio::test]
    async fn should_batch_write_one_call_per_shard() {
        // given
        let (service, partitions) = open_partitions(&["d0", "d1"]).await;
        let before = service.issued();

        // when
        let results = partitions
            .batch_write(vec![
                AttributeOp::add("k0", "n", "a"),
                AttributeOp::add("k1", "n", "b"),
                AttributeOp::replace("k1", "m", "c"),
            ])
            .await;

        // then - one batched call per shard, outcomes per shard
        assert_eq!(service.issued() - before, 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.result.is_ok()));
        assert_eq!(
            partitions
                .get_attributes("k1", None)
                .await
                .unwrap()
                .first_value("m"),
            Some("c")
        );
    }

    #[tokio::test]
    async fn should_delete_through_the_routed_shard() {
        // given
        let (_, partitions) = open_partitions(&["d0", "d1"]).await;
        partitions
            .put("k1", Update::new().add("n", "1"))
            .await
            .unwrap();

        // when
        partitions.delete_attributes("k1", None).await.unwrap();

        // then
        assert!(partitions.item_names().collect().await.unwrap().is_empty());
    }
}
