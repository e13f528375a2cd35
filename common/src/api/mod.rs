//! Request and response descriptors for the remote attribute store.
//!
//! This module defines the boundary between the access layer and the remote
//! service: the [`RemoteApi`] trait, the request/response shapes it exchanges,
//! the [`ServiceError`] failure taxonomy, and the documented service limits.
//!
//! Wire encoding (HTTP method, signing, marshalling) lives behind the trait
//! and is not owned by this crate. The query expression carried by
//! [`Request::Select`] is an opaque string interpreted server-side.

pub mod in_memory;

use async_trait::async_trait;

/// Maximum number of distinct items one batched write call may address.
pub const MAX_BATCH_ITEMS: usize = 25;

/// Maximum number of attribute name/value pairs one write call may carry.
pub const MAX_ATTRIBUTES_PER_REQUEST: usize = 256;

/// One attribute write operation addressed to an item by name.
///
/// Each operation carries exactly one value; multiple values for an
/// attribute are expressed as multiple operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeOp {
    /// Adds the value to the attribute's value set.
    Add {
        item: String,
        name: String,
        value: String,
    },
    /// Replaces the attribute's entire value set. When several replace
    /// operations in one call target the same attribute, the set is cleared
    /// once and all supplied values are stored.
    Replace {
        item: String,
        name: String,
        value: String,
    },
}

impl AttributeOp {
    /// Creates an additive operation.
    pub fn add(
        item: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        AttributeOp::Add {
            item: item.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates a replacing operation.
    pub fn replace(
        item: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        AttributeOp::Replace {
            item: item.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// The item this operation is addressed to.
    pub fn item(&self) -> &str {
        match self {
            AttributeOp::Add { item, .. } | AttributeOp::Replace { item, .. } => item,
        }
    }

    /// The attribute name this operation touches.
    pub fn name(&self) -> &str {
        match self {
            AttributeOp::Add { name, .. } | AttributeOp::Replace { name, .. } => name,
        }
    }

    /// The single value this operation carries.
    pub fn value(&self) -> &str {
        match self {
            AttributeOp::Add { value, .. } | AttributeOp::Replace { value, .. } => value,
        }
    }

    /// Whether this operation replaces the attribute rather than adding to it.
    pub fn is_replace(&self) -> bool {
        matches!(self, AttributeOp::Replace { .. })
    }
}

/// One attribute change within a single-item write request.
///
/// Unlike [`AttributeOp`] this is already scoped to the request's item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeUpdate {
    pub name: String,
    pub value: String,
    /// When `true`, the attribute's existing value set is replaced.
    pub replace: bool,
}

impl AttributeUpdate {
    pub fn new(name: impl Into<String>, value: impl Into<String>, replace: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            replace,
        }
    }
}

/// Optional precondition attached to a single-item write.
///
/// The service rejects the write with [`ServiceError::ConditionFailed`]
/// when the condition is unmet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PutCondition {
    /// Unconditional write.
    #[default]
    None,
    /// The attribute must currently hold the given value.
    ValueEquals { name: String, value: String },
    /// The attribute must not be present on the item.
    AttributeAbsent { name: String },
}

/// A request descriptor the remote service understands.
#[derive(Clone, Debug)]
pub enum Request {
    /// Fetches one page of a query. `next_token` resumes a prior page.
    Select {
        domain: String,
        /// Opaque query expression, interpreted server-side.
        expression: String,
        /// When present, only the named attributes are returned. An empty
        /// list yields item names with no attribute pairs.
        attributes: Option<Vec<String>>,
        next_token: Option<String>,
    },
    /// Reads one item's attributes, optionally projected.
    GetAttributes {
        domain: String,
        item: String,
        attributes: Option<Vec<String>>,
    },
    /// Writes attribute changes to one item, optionally guarded.
    PutAttributes {
        domain: String,
        item: String,
        updates: Vec<AttributeUpdate>,
        condition: PutCondition,
    },
    /// Applies several item-addressed operations in one call.
    BatchPutAttributes {
        domain: String,
        operations: Vec<AttributeOp>,
    },
    /// Deletes named attributes from an item, or the whole item when
    /// `attributes` is `None`.
    DeleteAttributes {
        domain: String,
        item: String,
        attributes: Option<Vec<String>>,
    },
    CreateDomain {
        domain: String,
    },
    DeleteDomain {
        domain: String,
    },
    DomainMetadata {
        domain: String,
    },
    /// Fetches one page of domain names.
    ListDomains {
        max_domains: Option<usize>,
        next_token: Option<String>,
    },
}

/// One item with its attribute pairs as returned by the service.
///
/// Pairs are flat `(name, value)` tuples; an attribute with several values
/// appears once per value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemData {
    pub name: String,
    pub pairs: Vec<(String, String)>,
}

/// Domain statistics returned by [`Request::DomainMetadata`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DomainMetadata {
    pub item_count: usize,
    pub attribute_name_count: usize,
    pub attribute_value_count: usize,
}

/// A response payload, mirroring the request that produced it.
///
/// Paged responses carry a continuation token while more pages exist;
/// its absence signals the end of the result set.
#[derive(Clone, Debug)]
pub enum Response {
    Select {
        items: Vec<ItemData>,
        next_token: Option<String>,
    },
    Attributes {
        pairs: Vec<(String, String)>,
    },
    /// A write (put, batch, delete, domain create/delete) was applied.
    Written,
    Metadata(DomainMetadata),
    DomainList {
        domains: Vec<String>,
        next_token: Option<String>,
    },
}

/// Error type for remote service calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service is temporarily overloaded. This is the only failure
    /// class a caller may retry.
    Unavailable(String),
    /// The request was malformed or violated a service limit.
    BadRequest(String),
    /// The addressed domain does not exist.
    NoSuchDomain(String),
    /// A write precondition was not met.
    ConditionFailed(String),
    /// The caller is not authorized for the operation.
    Unauthorized(String),
    /// Internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl ServiceError {
    /// Whether the failure may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Unavailable(_))
    }
}

impl std::error::Error for ServiceError {}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ServiceError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ServiceError::NoSuchDomain(domain) => write!(f, "No such domain: {}", domain),
            ServiceError::ConditionFailed(msg) => write!(f, "Condition failed: {}", msg),
            ServiceError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ServiceError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Result type alias for remote service calls.
pub type ApiResult<T> = std::result::Result<T, ServiceError>;

/// The remote attribute-store collaborator.
///
/// Every component that issues requests takes this as an explicit
/// constructor parameter; there is no ambient client binding.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Issues one request and waits for its response or failure.
    async fn issue(&self, request: Request) -> ApiResult<Response>;
}
