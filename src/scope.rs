//! Scopes, project root keys and documents.
//!
//! A [`Scope`] is where a document or a project root lives: either a path on
//! disk or the synthetic untitled scope shared by every unsaved document.
//! [`ProjectRootKey`] is the canonical string identity of a root scope and is
//! the key every coordinator map is indexed by.

use crate::env;
use crate::error::{CoordinatorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    File(PathBuf),
    Untitled,
}

/// Canonical identity of a project root
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectRootKey(String);

/// An open editor document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub uri: Scope,
    pub language_id: String,
}

impl Scope {
    /// Parse a document URI. Only `file:` and `untitled:` URIs are managed.
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri).map_err(|e| CoordinatorError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            env::scope::FILE_SCHEME => {
                let path = url
                    .to_file_path()
                    .map_err(|_| CoordinatorError::InvalidUri {
                        uri: uri.to_string(),
                        reason: "not a local file path".to_string(),
                    })?;
                Ok(Scope::File(path))
            }
            env::scope::UNTITLED_SCHEME => Ok(Scope::Untitled),
            other => Err(CoordinatorError::UnsupportedScheme {
                scheme: other.to_string(),
                uri: uri.to_string(),
            }),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Scope::File(path.into())
    }

    pub fn is_untitled(&self) -> bool {
        matches!(self, Scope::Untitled)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Scope::File(path) => Some(path),
            Scope::Untitled => None,
        }
    }

    pub fn key(&self) -> ProjectRootKey {
        match self {
            Scope::File(path) => ProjectRootKey(
                Url::from_file_path(path)
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| format!("file://{}", path.display())),
            ),
            Scope::Untitled => ProjectRootKey(env::scope::UNTITLED_ROOT_KEY.to_string()),
        }
    }

    /// Whether `other` lies inside this scope when this scope is used as a root.
    ///
    /// File roots contain every path below them (component-wise, so `/a/b`
    /// does not contain `/a/bc`). The untitled root contains only untitled
    /// documents.
    pub fn contains(&self, other: &Scope) -> bool {
        match (self, other) {
            (Scope::File(root), Scope::File(path)) => path.starts_with(root),
            (Scope::Untitled, Scope::Untitled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::File(path) => write!(f, "{}", path.display()),
            Scope::Untitled => write!(f, "{}", env::scope::UNTITLED_ROOT_KEY),
        }
    }
}

impl ProjectRootKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectRootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Document {
    pub fn new(uri: Scope, language_id: impl Into<String>) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
        }
    }

    /// Parse the document URI and wrap it
    pub fn from_uri(uri: &str, language_id: impl Into<String>) -> Result<Self> {
        Ok(Self::new(Scope::parse(uri)?, language_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_and_untitled() {
        let scope = Scope::parse("file:///work/proj/Main.lean").unwrap();
        assert_eq!(scope, Scope::file("/work/proj/Main.lean"));

        let untitled = Scope::parse("untitled:Untitled-1").unwrap();
        assert!(untitled.is_untitled());
        assert_eq!(untitled.key().as_str(), "untitled:");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = Scope::parse("git:/work/proj/Main.lean.git").unwrap_err();
        assert!(matches!(err, CoordinatorError::UnsupportedScheme { ref scheme, .. } if scheme == "git"));

        assert!(matches!(
            Scope::parse("not a uri"),
            Err(CoordinatorError::InvalidUri { .. })
        ));
    }

    #[test]
    fn test_same_root_same_key() {
        let a = Scope::parse("file:///work/proj").unwrap();
        let b = Scope::file("/work/proj");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "file:///work/proj");
    }

    #[test]
    fn test_contains_is_component_wise() {
        let root = Scope::file("/a/b");
        assert!(root.contains(&Scope::file("/a/b/c/file.lean")));
        assert!(root.contains(&Scope::file("/a/b")));
        assert!(!root.contains(&Scope::file("/a/bc/file.lean")));
        assert!(!root.contains(&Scope::Untitled));
        assert!(Scope::Untitled.contains(&Scope::Untitled));
        assert!(!Scope::Untitled.contains(&Scope::file("/a/b")));
    }
}
