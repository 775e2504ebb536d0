/**
 * Resource identities, versioned states, watch cursors and selectors
 */
use kube::ResourceExt;
use kube::core::DynamicObject;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Stable key for an observed resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceIdentity {
    #[must_use]
    pub fn new(kind: &str, namespace: Option<&str>, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Opaque resume position of a watch stream (a Kubernetes `resourceVersion`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(String);

impl Cursor {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a resource at one resource version.
///
/// Cloning is cheap: the object body is shared.
#[derive(Debug, Clone)]
pub struct ResourceState {
    id: ResourceIdentity,
    resource_version: Option<String>,
    object: Arc<DynamicObject>,
}

impl ResourceState {
    #[must_use]
    pub fn new(id: ResourceIdentity, object: DynamicObject) -> Self {
        Self {
            id,
            resource_version: object.metadata.resource_version.clone(),
            object: Arc::new(object),
        }
    }

    /// Build a state from an object received for collection `kind`.
    ///
    /// Returns `None` when the object carries no name and so has no identity.
    #[must_use]
    pub fn from_object(kind: &str, object: DynamicObject) -> Option<Self> {
        let name = object.metadata.name.clone()?;
        let id = ResourceIdentity {
            kind: kind.to_string(),
            namespace: object.namespace(),
            name,
        };
        Some(Self::new(id, object))
    }

    #[must_use]
    pub const fn id(&self) -> &ResourceIdentity {
        &self.id
    }

    #[must_use]
    pub fn resource_version(&self) -> Option<&str> {
        self.resource_version.as_deref()
    }

    #[must_use]
    pub fn object(&self) -> &DynamicObject {
        &self.object
    }

    #[must_use]
    pub fn cursor(&self) -> Option<Cursor> {
        self.resource_version.clone().map(Cursor)
    }

    /// True when both states carry the same known resource version
    #[must_use]
    pub fn same_version(&self, other: &Self) -> bool {
        matches!((self.resource_version(), other.resource_version()), (Some(a), Some(b)) if a == b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("{selector} selector has an empty term in {expr:?}")]
    EmptyTerm { selector: &'static str, expr: String },
    #[error("{selector} selector term {term:?} is not valid")]
    InvalidTerm { selector: &'static str, term: String },
    #[error("label selector {expr:?} has unbalanced parentheses")]
    Unbalanced { expr: String },
}

#[allow(clippy::expect_used)]
static FIELD_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][-A-Za-z0-9_./]*\s*(==|!=|=)\s*[^=!,\s]*$")
        .expect("field term pattern should compile")
});

#[allow(clippy::expect_used)]
static LABEL_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"!?[A-Za-z0-9][-A-Za-z0-9_./]*",
        r"|[A-Za-z0-9][-A-Za-z0-9_./]*\s*(?:==|!=|=)\s*[-A-Za-z0-9_.]*",
        r"|[A-Za-z0-9][-A-Za-z0-9_./]*\s+(?:in|notin)\s*\(\s*[-A-Za-z0-9_.]+(?:\s*,\s*[-A-Za-z0-9_.]+)*\s*\)",
        r")$"
    ))
    .expect("label term pattern should compile")
});

/// Field and label selectors, combined with logical AND by the server.
///
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    field: Option<String>,
    label: Option<String>,
}

impl Selectors {
    /// Validate and build selectors. Empty strings mean "no selector".
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] if either expression is malformed
    pub fn new(field: &str, label: &str) -> Result<Self, SelectorError> {
        let field = normalize(field);
        let label = normalize(label);
        if let Some(expr) = &field {
            validate_field(expr)?;
        }
        if let Some(expr) = &label {
            validate_label(expr)?;
        }
        Ok(Self { field, label })
    }

    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Display for Selectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fields={:?} labels={:?}",
            self.field.as_deref().unwrap_or(""),
            self.label.as_deref().unwrap_or("")
        )
    }
}

fn normalize(expr: &str) -> Option<String> {
    let trimmed = expr.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn validate_field(expr: &str) -> Result<(), SelectorError> {
    for term in expr.split(',').map(str::trim) {
        if term.is_empty() {
            return Err(SelectorError::EmptyTerm { selector: "field", expr: expr.to_string() });
        }
        if !FIELD_TERM.is_match(term) {
            return Err(SelectorError::InvalidTerm { selector: "field", term: term.to_string() });
        }
    }
    Ok(())
}

fn validate_label(expr: &str) -> Result<(), SelectorError> {
    for term in split_label_terms(expr)? {
        if term.is_empty() {
            return Err(SelectorError::EmptyTerm { selector: "label", expr: expr.to_string() });
        }
        if !LABEL_TERM.is_match(term) {
            return Err(SelectorError::InvalidTerm { selector: "label", term: term.to_string() });
        }
    }
    Ok(())
}

/// Split on commas that are not inside a set-based `(a,b)` value list
fn split_label_terms(expr: &str) -> Result<Vec<&str>, SelectorError> {
    let unbalanced = || SelectorError::Unbalanced { expr: expr.to_string() };
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or_else(unbalanced)?,
            ',' if depth == 0 => {
                terms.push(expr[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(unbalanced());
    }
    terms.push(expr[start..].trim());
    Ok(terms)
}
