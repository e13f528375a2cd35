//! Shard grouping and batched writes.

use std::collections::BTreeSet;

use common::{AttributeOp, Request, MAX_ATTRIBUTES_PER_REQUEST, MAX_BATCH_ITEMS};

use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::router::Router;

/// Outcome of the batched write against one shard.
///
/// A failure here never aborts sibling shards; callers inspect each entry.
#[derive(Debug)]
pub struct ShardWriteResult {
    /// The underlying domain the group was addressed to.
    pub domain: String,
    /// Number of operations in the group.
    pub operations: usize,
    /// The write outcome for this shard.
    pub result: Result<()>,
}

/// Groups item-addressed operations by shard and issues one batched write
/// per non-empty group.
///
/// The coordinator only routes: operations within a group are sent as-is,
/// with the add/replace meaning carried by each operation's own tag.
/// Unifying several operations on the same attribute is the update
/// builder's concern, not this one's.
pub(crate) struct BatchCoordinator<'a> {
    fetcher: &'a PageFetcher,
    domains: &'a [String],
    router: &'a Router,
}

impl<'a> BatchCoordinator<'a> {
    pub(crate) fn new(fetcher: &'a PageFetcher, domains: &'a [String], router: &'a Router) -> Self {
        Self {
            fetcher,
            domains,
            router,
        }
    }

    /// Routes `operations` and issues the per-shard writes sequentially in
    /// sorted-domain order.
    pub(crate) async fn apply(&self, operations: Vec<AttributeOp>) -> Vec<ShardWriteResult> {
        let mut groups: Vec<Vec<AttributeOp>> =
            (0..self.domains.len()).map(|_| Vec::new()).collect();

        if self.domains.len() == 1 {
            // Single-domain case: the router is never consulted.
            groups[0] = operations;
        } else {
            for op in operations {
                let shard = self.router.route(op.item(), self.domains.len());
                groups[shard].push(op);
            }
        }

        let mut results = Vec::new();
        for (domain, group) in self.domains.iter().zip(groups) {
            if group.is_empty() {
                continue;
            }
            let operations = group.len();
            let result = self.write_group(domain, group).await;
            results.push(ShardWriteResult {
                domain: domain.clone(),
                operations,
                result,
            });
        }
        results
    }

    async fn write_group(&self, domain: &str, group: Vec<AttributeOp>) -> Result<()> {
        // Oversized groups are surfaced, never split or truncated.
        let items: BTreeSet<&str> = group.iter().map(|op| op.item()).collect();
        if items.len() > MAX_BATCH_ITEMS {
            return Err(Error::BatchTooLarge {
                domain: domain.to_string(),
                items: items.len(),
            });
        }
        if group.len() > MAX_ATTRIBUTES_PER_REQUEST {
            return Err(Error::TooManyAttributes {
                domain: domain.to_string(),
                attributes: group.len(),
            });
        }

        self.fetcher
            .execute(Request::BatchPutAttributes {
                domain: domain.to_string(),
                operations: group,
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::{InMemoryService, RemoteApi, Response};

    use super::*;
    use crate::config::RetryConfig;

    /// Routes by the digit at the end of the item name, e.g. "k1" -> 1.
    fn digit_router() -> Router {
        Router::with_fn(Arc::new(|key: &str, count: usize| {
            key.chars()
                .last()
                .and_then(|c| c.to_digit(10))
                .unwrap_or(0) as usize
                % count
        }))
    }

    async fn service_with_domains(domains: &[&str]) -> Arc<InMemoryService> {
        let service = InMemoryService::new();
        for domain in domains {
            service
                .issue(Request::CreateDomain {
                    domain: domain.to_string(),
                })
                .await
                .unwrap();
        }
        Arc::new(service)
    }

    async fn item_names(service: &InMemoryService, domain: &str) -> Vec<String> {
        let Response::Select { items, .. } = service
            .issue(Request::Select {
                domain: domain.to_string(),
                expression: String::new(),
                attributes: None,
                next_token: None,
            })
            .await
            .unwrap()
        else {
            panic!("expected select response");
        };
        items.into_iter().map(|i| i.name).collect()
    }

    #[tokio::test]
    async fn should_issue_one_write_per_shard_with_operations() {
        // given - operations spanning both shards
        let service = service_with_domains(&["d0", "d1"]).await;
        let fetcher = PageFetcher::new(service.clone(), RetryConfig::default());
        let domains = vec!["d0".to_string(), "d1".to_string()];
        let router = digit_router();
        let coordinator = BatchCoordinator::new(&fetcher, &domains, &router);
        let before = service.issued();

        // when
        let results = coordinator
            .apply(vec![
                AttributeOp::add("k0", "n", "a"),
                AttributeOp::add("k1", "n", "b"),
                AttributeOp::add("k0", "m", "c"),
            ])
            .await;

        // then - exactly one call per non-empty shard group
        assert_eq!(service.issued() - before, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].domain, "d0");
        assert_eq!(results[0].operations, 2);
        assert!(results[0].result.is_ok());
        assert_eq!(results[1].domain, "d1");
        assert_eq!(results[1].operations, 1);
        assert!(results[1].result.is_ok());

        // and every operation landed in exactly one shard
        assert_eq!(item_names(&service, "d0").await, vec!["k0"]);
        assert_eq!(item_names(&service, "d1").await, vec!["k1"]);
    }

    #[tokio::test]
    async fn should_skip_empty_shard_groups() {
        // given - everything routes to shard 0
        let service = service_with_domains(&["d0", "d1"]).await;
        let fetcher = PageFetcher::new(service.clone(), RetryConfig::default());
        let domains = vec!["d0".to_string(), "d1".to_string()];
        let router = digit_router();
        let coordinator = BatchCoordinator::new(&fetcher, &domains, &router);

        // when
        let results = coordinator.apply(vec![AttributeOp::add("k0", "n", "a")]).await;

        // then
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].domain, "d0");
    }

    #[tokio::test]
    async fn should_not_consult_router_for_single_domain() {
        // given - a router that would panic if asked
        let service = service_with_domains(&["d"]).await;
        let fetcher = PageFetcher::new(service.clone(), RetryConfig::default());
        let domains = vec!["d".to_string()];
        let router = Router::with_fn(Arc::new(|_: &str, _: usize| {
            panic!("router must not be consulted")
        }));
        let coordinator = BatchCoordinator::new(&fetcher, &domains, &router);

        // when
        let results = coordinator.apply(vec![AttributeOp::add("k1", "n", "a")]).await;

        // then
        assert_eq!(results.len(), 1);
        assert!(results[0].result.is_ok());
    }

    #[tokio::test]
    async fn should_fail_oversized_group_without_issuing_call() {
        // given - one shard's group exceeds the item limit
        let service = service_with_domains(&["d"]).await;
        let fetcher = PageFetcher::new(service.clone(), RetryConfig::default());
        let domains = vec!["d".to_string()];
        let router = Router::new();
        let coordinator = BatchCoordinator::new(&fetcher, &domains, &router);
        let operations: Vec<AttributeOp> = (0..MAX_BATCH_ITEMS + 1)
            .map(|i| AttributeOp::add(format!("item-{i:03}"), "n", "v"))
            .collect();
        let before = service.issued();

        // when
        let results = coordinator.apply(operations).await;

        // then - surfaced as a permanent error naming shard and size
        assert_eq!(service.issued(), before);
        assert_eq!(
            results[0].result,
            Err(Error::BatchTooLarge {
                domain: "d".to_string(),
                items: MAX_BATCH_ITEMS + 1,
            })
        );
    }

    #[tokio::test]
    async fn should_attempt_remaining_shards_after_a_failure() {
        // given - shard d0 does not exist on the service
        let service = service_with_domains(&["d1"]).await;
        let fetcher = PageFetcher::new(service.clone(), RetryConfig::default());
        let domains = vec!["d0".to_string(), "d1".to_string()];
        let router = digit_router();
        let coordinator = BatchCoordinator::new(&fetcher, &domains, &router);

        // when
        let results = coordinator
            .apply(vec![
                AttributeOp::add("k0", "n", "a"),
                AttributeOp::add("k1", "n", "b"),
            ])
            .await;

        // then - partial success is visible per shard, not hidden
        assert_eq!(results.len(), 2);
        assert!(results[0].result.is_err());
        assert!(results[1].result.is_ok());
        assert_eq!(item_names(&service, "d1").await, vec!["k1"]);
    }
}
