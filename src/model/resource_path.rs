use std::fmt::{Display, Formatter};
use std::ops::Deref;

use crate::error::{invalid_argument, FirestoreResult};

/// Slash separated path to a collection or document, relative to the
/// database's `documents` root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments.into_iter().map(Into::into).collect();
        Self::new(segments)
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        if trimmed.contains("//") {
            return Err(invalid_argument("Found empty segment in resource path"));
        }

        for segment in trimmed.split('/') {
            Self::validate_segment(segment)?;
        }
        Ok(Self::from_segments(trimmed.split('/')))
    }

    /// Rejects ids Firestore reserves and those a URL parser would resolve
    /// as relative segments.
    pub(crate) fn validate_segment(segment: &str) -> FirestoreResult<()> {
        if segment.is_empty() {
            return Err(invalid_argument("Path segments cannot be empty"));
        }
        if segment.contains('/') {
            return Err(invalid_argument(format!(
                "Path segment '{segment}' cannot contain '/'"
            )));
        }
        if segment == "." || segment == ".." {
            return Err(invalid_argument(format!(
                "Path segment '{segment}' is not allowed"
            )));
        }
        if segment.len() >= 4 && segment.starts_with("__") && segment.ends_with("__") {
            return Err(invalid_argument(format!(
                "Path segment '{segment}' is reserved"
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut new_segments = self.segments.clone();
        new_segments.extend(segments.into_iter().map(Into::into));
        Self::new(new_segments)
    }

    pub fn without_last(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self::new(segments)
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join("/")
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(l, r)| l == r)
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

impl Deref for ResourcePath {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}
