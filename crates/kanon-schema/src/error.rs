//! The validation error tree.
//!
//! Every failure reported by the engine and by request validation is a
//! [`ValidationError`]. Consumers match on it exhaustively; there is no
//! "inspect the runtime type" path apart from [`Origin::Wrapped`], which is
//! where combinator branch lists live.

use std::error::Error as StdError;
use std::fmt;

/// Boxed error used for causes the tree does not model itself.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A validation failure.
#[derive(Debug)]
pub enum ValidationError {
    /// Several failures, in the order they were found.
    Multi(MultiError),
    /// A failure attributed to a request parameter or the request body.
    Field(FieldError),
    /// A schema mismatch at some path inside a JSON document.
    Schema(SchemaError),
    /// A raw value that could not be parsed into its declared type.
    Parse(ParseError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multi(e) => e.fmt(f),
            Self::Field(e) => e.fmt(f),
            Self::Schema(e) => e.fmt(f),
            Self::Parse(e) => e.fmt(f),
        }
    }
}

impl StdError for ValidationError {}

impl From<MultiError> for ValidationError {
    fn from(err: MultiError) -> Self {
        Self::Multi(err)
    }
}

impl From<FieldError> for ValidationError {
    fn from(err: FieldError) -> Self {
        Self::Field(err)
    }
}

impl From<SchemaError> for ValidationError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<ParseError> for ValidationError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

/// An ordered collection of validation errors.
#[derive(Debug, Default)]
pub struct MultiError(Vec<ValidationError>);

impl MultiError {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an error.
    pub fn push(&mut self, err: impl Into<ValidationError>) {
        self.0.push(err.into());
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the direct children in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Returns the children.
    #[must_use]
    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl From<Vec<ValidationError>> for MultiError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl FromIterator<ValidationError> for MultiError {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for MultiError {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a MultiError {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no errors");
        }
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl StdError for MultiError {}

/// Where a request parameter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    /// URL query string.
    Query,
    /// Templated path segment.
    Path,
    /// Request header.
    Header,
    /// `Cookie` header entry.
    Cookie,
}

impl ParameterLocation {
    /// The OpenAPI `in` value for this location.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Path => "path",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one named request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterLocator {
    /// Where the parameter lives.
    pub location: ParameterLocation,
    /// Parameter name as declared in the contract.
    pub name: String,
}

impl ParameterLocator {
    /// Creates a locator.
    #[must_use]
    pub fn new(location: ParameterLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
        }
    }

    /// Shorthand for a query parameter.
    #[must_use]
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(ParameterLocation::Query, name)
    }

    /// Shorthand for a path parameter.
    #[must_use]
    pub fn path(name: impl Into<String>) -> Self {
        Self::new(ParameterLocation::Path, name)
    }

    /// Shorthand for a header parameter.
    #[must_use]
    pub fn header(name: impl Into<String>) -> Self {
        Self::new(ParameterLocation::Header, name)
    }

    /// Shorthand for a cookie parameter.
    #[must_use]
    pub fn cookie(name: impl Into<String>) -> Self {
        Self::new(ParameterLocation::Cookie, name)
    }
}

impl fmt::Display for ParameterLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parameter {:?}", self.location, self.name)
    }
}

/// What a [`FieldError`] wraps.
#[derive(Debug)]
pub enum FieldCause {
    /// Several nested failures.
    Multi(MultiError),
    /// A schema mismatch.
    Schema(SchemaError),
    /// A parse failure.
    Parse(ParseError),
    /// Anything else, e.g. a required value that is missing.
    Other(BoxError),
}

impl fmt::Display for FieldCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multi(e) => e.fmt(f),
            Self::Schema(e) => e.fmt(f),
            Self::Parse(e) => e.fmt(f),
            Self::Other(e) => e.fmt(f),
        }
    }
}

/// A failure attributed to a request parameter, or to the body when
/// `parameter` is `None`.
#[derive(Debug)]
pub struct FieldError {
    /// The parameter at fault, if any.
    pub parameter: Option<ParameterLocator>,
    /// Short description. May be empty.
    pub reason: String,
    /// Underlying failure.
    pub cause: Option<FieldCause>,
}

impl FieldError {
    /// Creates a field error for `parameter` with the given cause.
    #[must_use]
    pub fn parameter(parameter: ParameterLocator, cause: FieldCause) -> Self {
        Self {
            parameter: Some(parameter),
            reason: String::new(),
            cause: Some(cause),
        }
    }

    /// Creates a field error for the request body.
    #[must_use]
    pub fn body(reason: impl Into<String>, cause: FieldCause) -> Self {
        Self {
            parameter: None,
            reason: reason.into(),
            cause: Some(cause),
        }
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(param) => write!(f, "{param} has an error")?,
            None => f.write_str("request body has an error")?,
        }
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl StdError for FieldError {}

/// One step in a JSON document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object property.
    Key(String),
    /// Array element.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// What caused a [`SchemaError`].
#[derive(Debug)]
pub enum Origin {
    /// A deeper schema error.
    Schema(Box<SchemaError>),
    /// A declared list of failures, as produced by `allOf`.
    Multi(MultiError),
    /// An opaque error. `anyOf`/`oneOf` branch lists arrive this way.
    Wrapped(BoxError),
}

/// A schema mismatch at `path`.
#[derive(Debug)]
pub struct SchemaError {
    /// What went wrong at this node.
    pub reason: String,
    /// Absolute path from the document root.
    pub path: Vec<PathSegment>,
    /// The schema keyword that failed, e.g. `type` or `anyOf`.
    pub keyword: String,
    /// Deeper cause, if any.
    pub origin: Option<Origin>,
}

impl SchemaError {
    /// Creates a leaf schema error.
    #[must_use]
    pub fn new(keyword: impl Into<String>, reason: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            reason: reason.into(),
            path,
            keyword: keyword.into(),
            origin: None,
        }
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Renders the path as a JSON pointer, `/a/0/b`.
    #[must_use]
    pub fn json_pointer(&self) -> String {
        self.path.iter().fold(String::new(), |mut acc, seg| {
            acc.push('/');
            acc.push_str(&seg.to_string().replace('~', "~0").replace('/', "~1"));
            acc
        })
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "error at {:?}: {}", self.json_pointer(), self.reason)
        }
    }
}

impl StdError for SchemaError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.origin {
            Some(Origin::Schema(inner)) => Some(inner.as_ref()),
            Some(Origin::Multi(multi)) => Some(multi),
            Some(Origin::Wrapped(err)) => Some(err.as_ref()),
            None => None,
        }
    }
}

/// Why a raw value failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The value could not be parsed into its declared type.
    InvalidFormat,
    /// The body is not valid JSON.
    InvalidJson,
    /// The value uses a serialization the validator does not support.
    Unsupported,
}

/// A raw value that could not be parsed.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The parameter at fault, if any.
    pub parameter: Option<ParameterLocator>,
    /// Failure category.
    pub kind: ParseErrorKind,
    /// Human-readable reason, e.g. `invalid integer`.
    pub reason: String,
}

impl ParseError {
    /// Creates a parse error for a parameter.
    #[must_use]
    pub fn parameter(parameter: ParameterLocator, reason: impl Into<String>) -> Self {
        Self {
            parameter: Some(parameter),
            kind: ParseErrorKind::InvalidFormat,
            reason: reason.into(),
        }
    }

    /// Creates a parse error for the body.
    #[must_use]
    pub fn body(kind: ParseErrorKind, reason: impl Into<String>) -> Self {
        Self {
            parameter: None,
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(param) => write!(f, "{param}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

impl StdError for ParseError {}

/// Failure of an `anyOf` or `oneOf` keyword.
///
/// The per-branch failures are kept inside this type and are not part of its
/// public API. Consumers see it only as an opaque [`Origin::Wrapped`] error.
#[derive(Debug)]
pub struct CombinatorMismatch {
    keyword: &'static str,
    branches: Vec<ValidationError>,
}

impl CombinatorMismatch {
    pub(crate) fn new(keyword: &'static str, branches: Vec<ValidationError>) -> Self {
        Self { keyword, branches }
    }

    /// The keyword that failed.
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        self.keyword
    }

    /// Number of branches that were tried.
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    #[doc(hidden)]
    #[must_use]
    pub fn __branches(&self) -> &[ValidationError] {
        &self.branches
    }
}

impl fmt::Display for CombinatorMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "doesn't match any of {} schemas from {:?}",
            self.branches.len(),
            self.keyword
        )
    }
}

impl StdError for CombinatorMismatch {}

/// Layout version of [`CombinatorMismatch`]'s hidden branch list.
///
/// Bumped whenever the shape returned by `__branches` changes.
#[doc(hidden)]
pub const COMBINATOR_LAYOUT_VERSION: u32 = 1;
