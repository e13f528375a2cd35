use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{
    ApiResult, AttributeOp, AttributeUpdate, DomainMetadata, ItemData, PutCondition, RemoteApi,
    Request, Response, ServiceError, MAX_ATTRIBUTES_PER_REQUEST, MAX_BATCH_ITEMS,
};

/// Attribute name to value set, for one item.
type Attributes = BTreeMap<String, BTreeSet<String>>;

/// Item name to attributes, for one domain.
type Items = BTreeMap<String, Attributes>;

const DEFAULT_PAGE_SIZE: usize = 100;

/// In-memory implementation of [`RemoteApi`] backed by nested BTreeMaps.
///
/// Stores all data in memory; useful for testing and local development.
/// Items are enumerated in lexicographic name order, and paged responses
/// carry a continuation token naming the last item of the page. The query
/// expression is treated as opaque: every item of the domain is returned
/// (server-side query planning is out of scope here), with attribute
/// projection applied when requested.
pub struct InMemoryService {
    domains: RwLock<BTreeMap<String, Items>>,
    page_size: usize,
    issued: AtomicUsize,
}

impl InMemoryService {
    /// Creates an empty service with the default page size.
    pub fn new() -> Self {
        Self {
            domains: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            issued: AtomicUsize::new(0),
        }
    }

    /// Sets the maximum number of results per page (at least 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of requests issued so far, including failed ones.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    fn select(
        &self,
        domain: &str,
        attributes: Option<&[String]>,
        next_token: Option<String>,
    ) -> ApiResult<Response> {
        let domains = self.read()?;
        let items = domains
            .get(domain)
            .ok_or_else(|| ServiceError::NoSuchDomain(domain.to_string()))?;

        let lower = match next_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Unbounded,
        };

        let mut page = Vec::new();
        let mut token = None;
        for (name, attrs) in items.range::<String, _>((lower, Bound::Unbounded)) {
            if page.len() == self.page_size {
                token = page.last().map(|data: &ItemData| data.name.clone());
                break;
            }
            page.push(ItemData {
                name: name.clone(),
                pairs: attribute_pairs(attrs, attributes),
            });
        }

        Ok(Response::Select {
            items: page,
            next_token: token,
        })
    }

    fn get_attributes(
        &self,
        domain: &str,
        item: &str,
        attributes: Option<&[String]>,
    ) -> ApiResult<Response> {
        let domains = self.read()?;
        let items = domains
            .get(domain)
            .ok_or_else(|| ServiceError::NoSuchDomain(domain.to_string()))?;

        // A missing item is an empty result, not an error.
        let pairs = items
            .get(item)
            .map(|attrs| attribute_pairs(attrs, attributes))
            .unwrap_or_default();

        Ok(Response::Attributes { pairs })
    }

    fn put_attributes(
        &self,
        domain: &str,
        item: &str,
        updates: Vec<AttributeUpdate>,
        condition: PutCondition,
    ) -> ApiResult<Response> {
        if updates.len() > MAX_ATTRIBUTES_PER_REQUEST {
            return Err(ServiceError::BadRequest(format!(
                "{} attribute updates exceed the per-request limit of {}",
                updates.len(),
                MAX_ATTRIBUTES_PER_REQUEST
            )));
        }

        let mut domains = self.write()?;
        let items = domains
            .get_mut(domain)
            .ok_or_else(|| ServiceError::NoSuchDomain(domain.to_string()))?;

        check_condition(items.get(item), &condition)?;

        let attrs = items.entry(item.to_string()).or_default();
        for update in &updates {
            if update.replace {
                attrs.remove(&update.name);
            }
        }
        for update in updates {
            attrs.entry(update.name).or_default().insert(update.value);
        }

        Ok(Response::Written)
    }

    fn batch_put(&self, domain: &str, operations: Vec<AttributeOp>) -> ApiResult<Response> {
        if operations.is_empty() {
            return Err(ServiceError::BadRequest(
                "batched write carries no operations".to_string(),
            ));
        }
        let distinct_items: BTreeSet<&str> = operations.iter().map(|op| op.item()).collect();
        if distinct_items.len() > MAX_BATCH_ITEMS {
            return Err(ServiceError::BadRequest(format!(
                "{} items exceed the per-batch limit of {}",
                distinct_items.len(),
                MAX_BATCH_ITEMS
            )));
        }
        if operations.len() > MAX_ATTRIBUTES_PER_REQUEST {
            return Err(ServiceError::BadRequest(format!(
                "{} operations exceed the per-request limit of {}",
                operations.len(),
                MAX_ATTRIBUTES_PER_REQUEST
            )));
        }

        let mut domains = self.write()?;
        let items = domains
            .get_mut(domain)
            .ok_or_else(|| ServiceError::NoSuchDomain(domain.to_string()))?;

        // Attributes named by at least one replace operation are cleared
        // once, then every supplied value is stored.
        for op in &operations {
            if op.is_replace() {
                if let Some(attrs) = items.get_mut(op.item()) {
                    attrs.remove(op.name());
                }
            }
        }
        for op in operations {
            let (AttributeOp::Add { item, name, value }
            | AttributeOp::Replace { item, name, value }) = op;
            items.entry(item).or_default().entry(name).or_default().insert(value);
        }

        Ok(Response::Written)
    }

    fn delete_attributes(
        &self,
        domain: &str,
        item: &str,
        attributes: Option<Vec<String>>,
    ) -> ApiResult<Response> {
        let mut domains = self.write()?;
        let items = domains
            .get_mut(domain)
            .ok_or_else(|| ServiceError::NoSuchDomain(domain.to_string()))?;

        match attributes {
            None => {
                items.remove(item);
            }
            Some(names) => {
                if let Some(attrs) = items.get_mut(item) {
                    for name in names {
                        attrs.remove(&name);
                    }
                    // Deleting an item's last attribute deletes the item.
                    if attrs.is_empty() {
                        items.remove(item);
                    }
                }
            }
        }

        Ok(Response::Written)
    }

    fn metadata(&self, domain: &str) -> ApiResult<Response> {
        let domains = self.read()?;
        let items = domains
            .get(domain)
            .ok_or_else(|| ServiceError::NoSuchDomain(domain.to_string()))?;

        let mut names: BTreeSet<&str> = BTreeSet::new();
        let mut values = 0;
        for attrs in items.values() {
            for (name, set) in attrs {
                names.insert(name);
                values += set.len();
            }
        }

        Ok(Response::Metadata(DomainMetadata {
            item_count: items.len(),
            attribute_name_count: names.len(),
            attribute_value_count: values,
        }))
    }

    fn list_domains(
        &self,
        max_domains: Option<usize>,
        next_token: Option<String>,
    ) -> ApiResult<Response> {
        let domains = self.read()?;
        let limit = max_domains.unwrap_or(self.page_size).max(1).min(self.page_size);

        let lower = match next_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Unbounded,
        };

        let mut page: Vec<String> = Vec::new();
        let mut token = None;
        for name in domains.range::<String, _>((lower, Bound::Unbounded)).map(|(n, _)| n) {
            if page.len() == limit {
                token = page.last().cloned();
                break;
            }
            page.push(name.clone());
        }

        Ok(Response::DomainList {
            domains: page,
            next_token: token,
        })
    }

    fn read(&self) -> ApiResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, Items>>> {
        self.domains
            .read()
            .map_err(|e| ServiceError::Internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> ApiResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Items>>> {
        self.domains
            .write()
            .map_err(|e| ServiceError::Internal(format!("Failed to acquire write lock: {}", e)))
    }
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new()
    }
}

/// Flattens one item's attributes into wire pairs, applying projection.
fn attribute_pairs(attrs: &Attributes, projection: Option<&[String]>) -> Vec<(String, String)> {
    attrs
        .iter()
        .filter(|(name, _)| match projection {
            Some(names) => names.iter().any(|n| n == *name),
            None => true,
        })
        .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
        .collect()
}

fn check_condition(attrs: Option<&Attributes>, condition: &PutCondition) -> ApiResult<()> {
    let met = match condition {
        PutCondition::None => true,
        PutCondition::ValueEquals { name, value } => attrs
            .and_then(|a| a.get(name))
            .is_some_and(|values| values.contains(value)),
        PutCondition::AttributeAbsent { name } => {
            attrs.map_or(true, |a| !a.contains_key(name))
        }
    };
    if met {
        Ok(())
    } else {
        Err(ServiceError::ConditionFailed(format!(
            "precondition {:?} not met",
            condition
        )))
    }
}

#[async_trait]
impl RemoteApi for InMemoryService {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn issue(&self, request: Request) -> ApiResult<Response> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        match request {
            Request::Select {
                domain,
                expression: _,
                attributes,
                next_token,
            } => self.select(&domain, attributes.as_deref(), next_token),
            Request::GetAttributes {
                domain,
                item,
                attributes,
            } => self.get_attributes(&domain, &item, attributes.as_deref()),
            Request::PutAttributes {
                domain,
                item,
                updates,
                condition,
            } => self.put_attributes(&domain, &item, updates, condition),
            Request::BatchPutAttributes { domain, operations } => {
                self.batch_put(&domain, operations)
            }
            Request::DeleteAttributes {
                domain,
                item,
                attributes,
            } => self.delete_attributes(&domain, &item, attributes),
            Request::CreateDomain { domain } => {
                self.write()?.entry(domain).or_default();
                Ok(Response::Written)
            }
            Request::DeleteDomain { domain } => {
                self.write()?.remove(&domain);
                Ok(Response::Written)
            }
            Request::DomainMetadata { domain } => self.metadata(&domain),
            Request::ListDomains {
                max_domains,
                next_token,
            } => self.list_domains(max_domains, next_token),
        }
    }
}

/// Injected failure that fires a fixed number of times or on every call.
#[cfg(feature = "test-utils")]
#[derive(Clone)]
enum Failure {
    /// Error is returned `n` more times, then automatically cleared.
    Times(u32, ServiceError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(ServiceError),
}

#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Times`], the counter is decremented and the slot clears
/// once it reaches zero. For [`Failure::Persistent`], the slot is left
/// unchanged.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> ApiResult<()> {
    use std::sync::Arc;

    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Times(n, err)) => {
            let next = if *n <= 1 {
                None
            } else {
                Some(Failure::Times(n - 1, err.clone()))
            };
            slot.store(Arc::new(next));
            Err(err.clone())
        }
    }
}

/// A service wrapper that delegates to an inner [`RemoteApi`] but can
/// inject failures on demand, and counts every issued request.
///
/// Failures can be *persistent* (returned on every call until cleared) or
/// fire a fixed number of *times* before automatically clearing — the shape
/// retry tests need ("fail transiently exactly M times, then succeed").
///
/// Gated behind the `test-utils` feature.
///
/// # Example
///
/// ```ignore
/// let inner = Arc::new(InMemoryService::new());
/// let service = FailingService::wrap(inner);
/// service.fail_times(2, ServiceError::Unavailable("overloaded".into()));
/// // the next two issue calls return Err(...), then delegate normally
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingService {
    inner: std::sync::Arc<dyn RemoteApi>,
    fail_issue: FailSlot,
    issued: AtomicUsize,
}

#[cfg(feature = "test-utils")]
impl FailingService {
    /// Wraps an existing service with no failure initially set.
    pub fn wrap(inner: std::sync::Arc<dyn RemoteApi>) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            inner,
            fail_issue: arc_swap::ArcSwap::from_pointee(None),
            issued: AtomicUsize::new(0),
        })
    }

    /// Makes every subsequent call return the given error until cleared.
    pub fn fail(&self, err: ServiceError) {
        self.fail_issue
            .store(std::sync::Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes the next `times` calls return the given error, then clears.
    pub fn fail_times(&self, times: u32, err: ServiceError) {
        self.fail_issue
            .store(std::sync::Arc::new(Some(Failure::Times(times, err))));
    }

    /// Clears any injected failure.
    pub fn clear(&self) {
        self.fail_issue.store(std::sync::Arc::new(None));
    }

    /// Number of issue calls observed, including failed ones.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl RemoteApi for FailingService {
    async fn issue(&self, request: Request) -> ApiResult<Response> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        check_failure(&self.fail_issue)?;
        self.inner.issue(request).await
    }
}
