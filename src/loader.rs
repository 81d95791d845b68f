//! External collaborator boundaries: persistence loading and expression
//! sourcing live behind these traits, out of scope for the data plane.

use crate::Result;
use crate::TagValue;

/// Persistence collaborator for one entity type.
///
/// The cache calls these only at load and configuration boundaries, never
/// on the hot evaluation path. Retries, if any, belong to the implementor.
pub trait EntityLoader<V>: Send + Sync {
    /// Fetches the persisted entity on a cold cache miss.
    fn load(
        &self,
        id: u64,
    ) -> Result<Option<V>>;

    /// Records a newly configured entity.
    fn insert(
        &self,
        entity: &V,
    ) -> Result<()>;

    /// Records a configuration change.
    fn update_config(
        &self,
        entity: &V,
    ) -> Result<()>;

    /// Records an unconfiguration.
    fn delete(
        &self,
        id: u64,
    ) -> Result<()>;
}

/// One persisted expression definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionDef {
    pub rule_id: u64,
    pub text: String,
}

/// Source of persisted rule expressions, consulted at scheduler startup and
/// optionally for audit write-through of computed values.
pub trait ExpressionSource: Send + Sync {
    fn get_all_expressions(&self) -> Result<Vec<ExpressionDef>>;

    /// Optionally persists a computed rule value for audit.
    fn update_config(
        &self,
        rule_id: u64,
        value: &TagValue,
    ) -> Result<()>;
}
