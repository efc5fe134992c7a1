//! Node names and node paths for the merged configuration tree
//!
//! A node name may carry a same-name-sibling (SNS) index: `foo`, `foo[2]`.
//! Index 0 means "no explicit index" and is treated as the first sibling, so
//! `foo` and `foo[1]` identify the same node. Use [`PathSegment::exact_eq`]
//! when the written form matters.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static SEGMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[\]/]+?)(?:\[([0-9]+)\])?$").expect("segment pattern is a valid regex")
});

/// One possibly-indexed node name
#[derive(Debug, Clone)]
pub struct PathSegment {
    name: String,
    index: usize,
}

impl PathSegment {
    /// The root segment: empty name, never indexed.
    pub fn root() -> Self {
        Self {
            name: String::new(),
            index: 0,
        }
    }

    /// Parse `name` or `name[index]`.
    ///
    /// The index must be a positive integer without leading zeros.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidPathSegment {
            text: text.to_string(),
            message: message.to_string(),
        };

        if text.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        let captures = SEGMENT_PATTERN
            .captures(text)
            .ok_or_else(|| invalid("expected 'name' or 'name[index]'"))?;

        let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let index = match captures.get(2) {
            None => 0,
            Some(digits) => {
                let digits = digits.as_str();
                if digits.starts_with('0') {
                    return Err(invalid("index must be a positive integer without leading zeros"));
                }
                digits
                    .parse::<usize>()
                    .map_err(|_| invalid("index is out of range"))?
            }
        };

        Ok(Self {
            name: name.to_string(),
            index,
        })
    }

    /// Build a segment from an already validated name and an index.
    pub fn new(name: &str, index: usize) -> Result<Self> {
        Self::parse(name)?.with_index(index)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The index as written; 0 when no index was given.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Return a copy carrying `index`. The root segment cannot be indexed.
    pub fn with_index(&self, index: usize) -> Result<Self> {
        if self.is_root() {
            return Err(Error::InvalidPathSegment {
                text: format!("[{}]", index),
                message: "the root segment cannot be indexed".to_string(),
            });
        }
        Ok(Self {
            name: self.name.clone(),
            index,
        })
    }

    /// Promote an implicit index (0) to an explicit first sibling (1).
    pub fn force_index(&self) -> Self {
        if self.index == 0 && !self.is_root() {
            Self {
                name: self.name.clone(),
                index: 1,
            }
        } else {
            self.clone()
        }
    }

    /// Demote an explicit first sibling (1) to the implicit form (0).
    pub fn suppress_index(&self) -> Self {
        if self.index == 1 {
            Self {
                name: self.name.clone(),
                index: 0,
            }
        } else {
            self.clone()
        }
    }

    /// Strict comparison: `foo` and `foo[1]` are different here.
    pub fn exact_eq(&self, other: &Self) -> bool {
        self.name == other.name && self.index == other.index
    }

    fn effective_index(&self) -> usize {
        self.index.max(1)
    }
}

impl PartialEq for PathSegment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.effective_index() == other.effective_index()
    }
}

impl Eq for PathSegment {}

impl Hash for PathSegment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.effective_index().hash(state);
    }
}

impl PartialOrd for PathSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.effective_index().cmp(&other.effective_index()))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.index)
        }
    }
}

/// An absolute path in the configuration tree, e.g. `/a/b[2]/c`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    segments: Vec<PathSegment>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse an absolute path. Empty segments (`//`) are rejected.
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path.strip_prefix('/').ok_or_else(|| Error::InvalidPath {
            path: path.to_string(),
            message: "path must start with '/'".to_string(),
        })?;
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let segments = rest
            .split('/')
            .map(|part| {
                if part.is_empty() {
                    return Err(Error::InvalidPath {
                        path: path.to_string(),
                        message: "path contains an empty segment".to_string(),
                    });
                }
                PathSegment::parse(part)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The last segment, or the root segment for `/`.
    pub fn last(&self) -> PathSegment {
        self.segments
            .last()
            .cloned()
            .unwrap_or_else(PathSegment::root)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// True when `self` equals `other` or lies below it.
    pub fn starts_with(&self, other: &Self) -> bool {
        other.segments.len() <= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.segments.len() < other.segments.len() && other.starts_with(self)
    }

    /// Segments of `self` below `ancestor`, if `ancestor` is a prefix.
    pub fn relative_to(&self, ancestor: &Self) -> Option<&[PathSegment]> {
        if self.starts_with(ancestor) {
            Some(&self.segments[ancestor.segments.len()..])
        } else {
            None
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment.suppress_index())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        let segment = PathSegment::parse("foo").unwrap();
        assert_eq!(segment.name(), "foo");
        assert_eq!(segment.index(), 0);
        assert_eq!(segment.to_string(), "foo");
    }

    #[test]
    fn test_parse_indexed_name() {
        let segment = PathSegment::parse("hippo:foo[12]").unwrap();
        assert_eq!(segment.name(), "hippo:foo");
        assert_eq!(segment.index(), 12);
        assert_eq!(segment.to_string(), "hippo:foo[12]");
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for text in ["", "foo[", "foo]", "foo[0]", "foo[01]", "foo[-1]", "foo[x]", "a/b", "[1]"] {
            let result = PathSegment::parse(text);
            assert!(
                matches!(result, Err(Error::InvalidPathSegment { .. })),
                "'{}' should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_zero_and_one_are_the_same_sibling() {
        let implicit = PathSegment::parse("foo").unwrap();
        let explicit = PathSegment::parse("foo[1]").unwrap();
        assert_eq!(implicit, explicit);
        assert!(!implicit.exact_eq(&explicit));
        assert_eq!(implicit.cmp(&explicit), Ordering::Equal);
        assert_ne!(implicit, PathSegment::parse("foo[2]").unwrap());
    }

    #[test]
    fn test_force_and_suppress_index() {
        let implicit = PathSegment::parse("foo").unwrap();
        assert_eq!(implicit.force_index().index(), 1);
        assert_eq!(implicit.force_index().suppress_index().index(), 0);
        let second = PathSegment::parse("foo[2]").unwrap();
        assert_eq!(second.force_index().index(), 2);
        assert_eq!(second.suppress_index().index(), 2);
    }

    #[test]
    fn test_root_cannot_be_indexed() {
        let root = PathSegment::root();
        assert!(root.is_root());
        assert!(root.with_index(2).is_err());
        assert_eq!(root.force_index().index(), 0);
    }

    #[test]
    fn test_ordering_by_name_then_index() {
        let mut segments: Vec<PathSegment> = ["b", "a[3]", "a", "a[2]"]
            .iter()
            .map(|s| PathSegment::parse(s).unwrap())
            .collect();
        segments.sort();
        let printed: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        assert_eq!(printed, vec!["a", "a[2]", "a[3]", "b"]);
    }

    #[test]
    fn test_node_path_roundtrip() {
        let path = NodePath::parse("/a/b[2]/c[1]").unwrap();
        assert_eq!(path.depth(), 3);
        assert_eq!(path.to_string(), "/a/b[2]/c");
        assert_eq!(NodePath::parse("/").unwrap(), NodePath::root());
        assert_eq!(NodePath::root().to_string(), "/");
    }

    #[test]
    fn test_node_path_rejects_relative_and_empty_segments() {
        assert!(NodePath::parse("a/b").is_err());
        assert!(NodePath::parse("/a//b").is_err());
        assert!(NodePath::parse("/a/b[0]").is_err());
    }

    #[test]
    fn test_node_path_ancestry() {
        let a = NodePath::parse("/a").unwrap();
        let ab = NodePath::parse("/a/b").unwrap();
        let ab1 = NodePath::parse("/a/b[1]/c").unwrap();
        assert!(a.is_ancestor_of(&ab));
        assert!(!ab.is_ancestor_of(&ab));
        assert!(ab.starts_with(&ab));
        assert!(ab1.starts_with(&ab));
        assert_eq!(ab1.parent().unwrap(), ab);
        assert_eq!(ab1.relative_to(&a).map(|s| s.len()), Some(2));
        assert!(NodePath::root().parent().is_none());
    }
}
