//! Semantic rewrite passes.
//!
//! Each pass takes the query by value and hands back the rewritten query.
//! [`TransformPipeline::standard`] runs the six passes in their fixed order;
//! the first error aborts the whole pipeline.

mod block_relation;
mod group;
mod having;
mod identity;
mod outer_join;
mod pushdown;
mod visit_mut;

pub(crate) use block_relation::catalog_table;
pub use block_relation::BlockRelationTransform;
pub use group::GroupTransform;
pub use having::HavingTransform;
pub use identity::IdentityTransform;
pub use outer_join::OuterJoinFilterTransform;
pub use pushdown::{homogeneous_alias, PushFilterTransform};

use tracing::debug;

use crate::ast::Query;
use crate::error::TransformError;
use crate::resolver::{RelationResolver, ResolverConfig};

/// A single rewrite pass over a query.
pub trait QueryTransform: Send + Sync {
    /// Unique name for this pass
    fn name(&self) -> &'static str;

    /// Rewrite the query
    fn transform(&self, query: Query) -> Result<Query, TransformError>;
}

/// Ordered list of rewrite passes.
pub struct TransformPipeline {
    transforms: Vec<Box<dyn QueryTransform>>,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// The standard six passes, in order.
    pub fn standard(resolver: RelationResolver, config: ResolverConfig) -> Self {
        Self::new()
            .with_transform(BlockRelationTransform::new(resolver.clone(), config))
            .with_transform(HavingTransform)
            .with_transform(GroupTransform)
            .with_transform(IdentityTransform::new(resolver))
            .with_transform(PushFilterTransform)
            .with_transform(OuterJoinFilterTransform)
    }

    /// Append a pass
    pub fn with_transform(mut self, transform: impl QueryTransform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Names of the passes in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run every pass in order.
    pub fn apply(&self, query: Query) -> Result<Query, TransformError> {
        self.transforms.iter().try_fold(query, |query, transform| {
            debug!(transform = transform.name(), "applying rewrite pass");
            transform.transform(query)
        })
    }
}
