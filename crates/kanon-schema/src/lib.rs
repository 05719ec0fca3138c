//! # Kanon Schema
//!
//! The schema-matching engine used by Kanon.
//!
//! - [`Schema`] - Schema Object model, parsed with serde
//! - [`SchemaValidator`] - Checks a `serde_json::Value`, collecting every failure
//! - [`ValidationError`] - The error tree shared with request validation
//!
//! `anyOf` and `oneOf` failures carry their per-branch errors inside an opaque
//! [`CombinatorMismatch`]. Only `kanon-contract` reads them back out.

#![doc(html_root_url = "https://docs.rs/kanon-schema/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod format;
mod schema;
mod validator;

pub use error::{
    BoxError, CombinatorMismatch, FieldCause, FieldError, MultiError, Origin, ParameterLocation,
    ParameterLocator, ParseError, ParseErrorKind, PathSegment, SchemaError, ValidationError,
    COMBINATOR_LAYOUT_VERSION,
};
pub use schema::{
    component_name, AdditionalProperties, Components, ExclusiveBound, InstanceType, Pattern,
    Schema, SchemaType, COMPONENT_REF_PREFIX,
};
pub use validator::{SchemaValidator, MAX_REF_DEPTH};
