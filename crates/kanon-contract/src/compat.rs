//! Recovery of `anyOf` / `oneOf` branch lists.
//!
//! The schema engine reports a failed `anyOf` or `oneOf` as a
//! [`SchemaError`](kanon_schema::SchemaError) whose origin is an opaque
//! [`CombinatorMismatch`]. The branch list it holds is not part of the
//! engine's public contract. This module is the only place that reaches for
//! it, and it is pinned to one known layout of that type.

use kanon_schema::{BoxError, CombinatorMismatch, MultiError, Origin, ValidationError};
use thiserror::Error;

/// The wrapper layout this module was written against.
const SUPPORTED_LAYOUT: u32 = 1;

const _: () = assert!(
    kanon_schema::COMBINATOR_LAYOUT_VERSION == SUPPORTED_LAYOUT,
    "kanon-schema changed the CombinatorMismatch layout; update kanon-contract::compat"
);

/// Why the branches of a wrapped origin could not be recovered.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The wrapped error is not a combinator mismatch.
    #[error("wrapped origin is not a combinator mismatch: {0}")]
    UnknownWrapper(String),

    /// One branch does not resolve to a multi error.
    #[error("branch {index} of {keyword} is not a multi error")]
    UnexpectedBranch {
        /// Combinator keyword.
        keyword: &'static str,
        /// Position of the branch.
        index: usize,
    },
}

/// Recovers the per-branch failures of a wrapped combinator error.
///
/// Each branch must be a [`MultiError`], either directly or at the end of a
/// chain of schema errors. Any other shape fails the whole recovery.
pub fn recover_branches(wrapped: &BoxError) -> Result<Vec<&MultiError>, RecoveryError> {
    let mismatch = wrapped
        .downcast_ref::<CombinatorMismatch>()
        .ok_or_else(|| RecoveryError::UnknownWrapper(wrapped.to_string()))?;

    mismatch
        .__branches()
        .iter()
        .enumerate()
        .map(|(index, branch)| {
            innermost_multi(branch).ok_or(RecoveryError::UnexpectedBranch {
                keyword: mismatch.keyword(),
                index,
            })
        })
        .collect()
}

fn innermost_multi(error: &ValidationError) -> Option<&MultiError> {
    match error {
        ValidationError::Multi(multi) => Some(multi),
        ValidationError::Schema(schema) => {
            let mut origin = schema.origin.as_ref();
            loop {
                match origin? {
                    Origin::Multi(multi) => return Some(multi),
                    Origin::Schema(inner) => origin = inner.origin.as_ref(),
                    Origin::Wrapped(_) => return None,
                }
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanon_schema::{Components, Schema, SchemaError, SchemaValidator};
    use serde_json::json;

    fn wrapped_origin(error: ValidationError) -> BoxError {
        match error {
            ValidationError::Schema(SchemaError {
                origin: Some(Origin::Wrapped(wrapped)),
                ..
            }) => wrapped,
            other => panic!("expected a wrapped origin, got {other:?}"),
        }
    }

    #[test]
    fn test_engine_layout_still_supported() {
        // If this fails, kanon-schema changed how it stores combinator
        // branches and recover_branches must be revisited before release.
        assert_eq!(kanon_schema::COMBINATOR_LAYOUT_VERSION, SUPPORTED_LAYOUT);

        let components = Components::new();
        let schema = Schema::from_value(json!({
            "anyOf": [{"type": "string"}, {"type": "integer", "minimum": 10}]
        }))
        .unwrap();
        let mut errors = SchemaValidator::new(&components)
            .validate(&schema, &json!(3))
            .unwrap_err()
            .into_inner();
        assert_eq!(errors.len(), 1);

        let wrapped = wrapped_origin(errors.remove(0));
        let branches = recover_branches(&wrapped).expect("engine branches must be recoverable");
        assert_eq!(branches.len(), 2);
        assert!(branches.iter().all(|branch| branch.len() == 1));
    }

    #[test]
    fn test_unknown_wrapper() {
        let wrapped: BoxError = Box::new(std::io::Error::other("boom"));
        let err = recover_branches(&wrapped).unwrap_err();
        assert!(matches!(err, RecoveryError::UnknownWrapper(ref detail) if detail == "boom"));
    }

    #[test]
    fn test_schema_chain_unwraps_to_multi() {
        let leaf = SchemaError::new("type", "value must be a string", vec![]);
        let chained = ValidationError::Schema(
            SchemaError::new("items", "outer", vec![]).with_origin(Origin::Schema(Box::new(
                SchemaError::new("items", "inner", vec![])
                    .with_origin(Origin::Multi(MultiError::from(vec![leaf.into()]))),
            ))),
        );
        assert_eq!(innermost_multi(&chained).map(MultiError::len), Some(1));

        let bare_leaf = ValidationError::Schema(SchemaError::new("type", "x", vec![]));
        assert!(innermost_multi(&bare_leaf).is_none());
    }
}
