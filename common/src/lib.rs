pub mod api;

pub use api::in_memory::InMemoryService;
pub use api::{
    ApiResult, AttributeOp, AttributeUpdate, DomainMetadata, ItemData, PutCondition, RemoteApi,
    Request, Response, ServiceError, MAX_ATTRIBUTES_PER_REQUEST, MAX_BATCH_ITEMS,
};

#[cfg(feature = "test-utils")]
pub use api::in_memory::FailingService;
