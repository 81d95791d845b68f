//! Rule model and scheduled recomputation: expression-backed derived values
//! recomputed on a fixed cycle against current cache contents.

mod expression;
mod scheduler;

pub use expression::*;
pub use scheduler::*;

use crate::cache::Cacheable;
use crate::ConfigurationError;
use crate::Quality;
use crate::Result;
use crate::TagValue;

/// An expression-backed derived value.
///
/// The compiled handle for the expression text is process-local and lives in
/// the scheduler's [`ExpressionRegistry`], not in the entity: the cache only
/// carries the text and the last computed value.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTag {
    pub id: u64,
    /// Source expression text
    pub expression: String,
    /// Last computed value; kept across failed evaluations
    pub value: Option<TagValue>,
    pub quality: Quality,
    /// Declared read-only dependencies; informational, never used for push
    pub referenced_tag_ids: Vec<u64>,
    pub cache_timestamp: i64,
}

impl RuleTag {
    /// Validated construction; a failed construction never reaches a cache.
    pub fn new(
        id: u64,
        expression: impl Into<String>,
    ) -> Result<Self> {
        let expression = expression.into();
        if id == 0 {
            return Err(ConfigurationError::InvalidParameter {
                parameter: "id",
                reason: "must be greater than 0".into(),
            }
            .into());
        }
        if expression.trim().is_empty() {
            return Err(ConfigurationError::InvalidParameter {
                parameter: "expression",
                reason: "must not be empty".into(),
            }
            .into());
        }
        Ok(Self {
            id,
            expression,
            value: None,
            quality: Quality::invalid(crate::InvalidReason::Unknown),
            referenced_tag_ids: Vec::new(),
            cache_timestamp: crate::now_millis(),
        })
    }
}

impl Cacheable for RuleTag {
    fn id(&self) -> u64 {
        self.id
    }

    fn cache_timestamp(&self) -> i64 {
        self.cache_timestamp
    }
}
