use std::fmt::{Display, Formatter};

use crate::error::{invalid_argument, FirestoreResult};

/// Path to a (possibly nested) field inside a document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new<S, I>(segments: I) -> FirestoreResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(invalid_argument(
                "FieldPath must contain at least one segment",
            ));
        }
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(invalid_argument("FieldPath segments cannot be empty"));
        }
        Ok(Self { segments })
    }

    /// Splits `a.b.c` into segments. Dots always separate segments here; use
    /// [`FieldPath::new`] for keys that contain a literal dot.
    pub fn from_dot_separated(path: &str) -> FirestoreResult<Self> {
        if path.trim().is_empty() {
            return Err(invalid_argument("FieldPath string cannot be empty"));
        }
        FieldPath::new(path.split('.')).map_err(|_| {
            invalid_argument(format!("Invalid field path '{path}': empty segment"))
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Server form of the path; segments that are not plain identifiers are
    /// wrapped in back-ticks.
    pub fn canonical_string(&self) -> String {
        self.segments
            .iter()
            .map(|segment| quote_segment(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.len() <= other.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(l, r)| l == r)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn quote_segment(segment: &str) -> String {
    if is_simple_segment(segment) {
        return segment.to_string();
    }
    let escaped = segment.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{escaped}`")
}

/// Trait that converts common user inputs into a validated [`FieldPath`].
pub trait IntoFieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath>;
}

impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self)
    }
}

impl<'a> IntoFieldPath for &'a FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self.clone())
    }
}

impl IntoFieldPath for String {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(&self)
    }
}

impl<'a> IntoFieldPath for &'a str {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dot_path() {
        let field = FieldPath::from_dot_separated("specifications.power").unwrap();
        assert_eq!(field.segments(), &["specifications", "power"]);
        assert_eq!(field.canonical_string(), "specifications.power");
    }

    #[test]
    fn rejects_empty() {
        let err = FieldPath::from_dot_separated("").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
        assert!(FieldPath::from_dot_separated("a..b").is_err());
    }

    #[test]
    fn quotes_non_identifier_segments() {
        let field = FieldPath::new(["specs", "power-rating"]).unwrap();
        assert_eq!(field.canonical_string(), "specs.`power-rating`");
        let dotted = FieldPath::new(["a.b"]).unwrap();
        assert_eq!(dotted.canonical_string(), "`a.b`");
        let tick = FieldPath::new(["x`y"]).unwrap();
        assert_eq!(tick.canonical_string(), "`x\\`y`");
        let numeric = FieldPath::new(["2024"]).unwrap();
        assert_eq!(numeric.canonical_string(), "`2024`");
    }

    #[test]
    fn prefix_relation() {
        let parent = FieldPath::from_dot_separated("a.b").unwrap();
        let child = FieldPath::from_dot_separated("a.b.c").unwrap();
        let sibling = FieldPath::from_dot_separated("a.bc").unwrap();
        assert!(parent.is_prefix_of(&child));
        assert!(parent.is_prefix_of(&parent));
        assert!(!parent.is_prefix_of(&sibling));
    }
}
