//! API version identifiers and version restrictions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Name of the sentinel version used when a caller does not ask for one.
pub const UNSPECIFIED_VERSION: &str = "unspecified";

/// Identifier selecting which field set of a class's evolution is rendered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiVersion(String);

impl ApiVersion {
    /// Create a version from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `unspecified` sentinel version.
    pub fn unspecified() -> Self {
        Self(UNSPECIFIED_VERSION.to_string())
    }

    /// Whether this is the `unspecified` sentinel.
    pub fn is_unspecified(&self) -> bool {
        self.0 == UNSPECIFIED_VERSION
    }

    /// Get the version name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::unspecified()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApiVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ApiVersion {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Versions under which a field is visible.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSet {
    /// Visible under every requested version.
    #[default]
    All,
    /// Visible only under the listed versions.
    Only(BTreeSet<ApiVersion>),
}

impl VersionSet {
    /// Restrict to the given versions.
    pub fn only<I, V>(versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ApiVersion>,
    {
        Self::Only(versions.into_iter().map(Into::into).collect())
    }

    /// Whether a render at `version` includes the field.
    pub fn contains(&self, version: &ApiVersion) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(version),
        }
    }

    /// Versions named explicitly by this restriction.
    pub fn named(&self) -> impl Iterator<Item = &ApiVersion> {
        let set = match self {
            Self::All => None,
            Self::Only(set) => Some(set),
        };
        set.into_iter().flatten()
    }
}
