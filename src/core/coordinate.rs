//! Package coordinates - WHICH package (group + artifact + version).
//!
//! Coordinates are interned, so equality and hashing are pointer operations
//! while ordering still follows the canonical `group:artifact:version` text.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{LazyLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Global coordinate interner
static COORDINATE_INTERNER: LazyLock<RwLock<HashMap<CoordinateInner, &'static CoordinateInner>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// A `group:artifact:version` triple identifying one package (interned).
///
/// Two coordinates are equal exactly when their canonical strings are equal.
#[derive(Clone, Copy)]
pub struct Coordinate {
    inner: &'static CoordinateInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CoordinateInner {
    group_id: String,
    artifact_id: String,
    version: String,
}

/// Error returned when a coordinate string is not `group:artifact[:version]`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid coordinate '{0}', expected group:artifact:version")]
pub struct CoordinateParseError(pub String);

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::intern(CoordinateInner {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        })
    }

    /// The distinguished empty coordinate.
    pub fn empty() -> Self {
        Self::new("", "", "")
    }

    fn intern(inner: CoordinateInner) -> Self {
        // Fast path: check if already interned
        {
            let interner = COORDINATE_INTERNER
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(&interned) = interner.get(&inner) {
                return Coordinate { inner: interned };
            }
        }

        let mut interner = COORDINATE_INTERNER
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // Double-check after acquiring write lock
        if let Some(&interned) = interner.get(&inner) {
            return Coordinate { inner: interned };
        }

        let leaked: &'static CoordinateInner = Box::leak(Box::new(inner.clone()));
        interner.insert(inner, leaked);

        Coordinate { inner: leaked }
    }

    /// Parse `group:artifact:version`. A two-part `group:artifact` form has an empty version.
    pub fn parse(text: &str) -> Result<Self, CoordinateParseError> {
        let parts: Vec<&str> = text.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *artifact, *version))
            }
            [group, artifact] if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(*group, *artifact, ""))
            }
            _ => Err(CoordinateParseError(text.to_string())),
        }
    }

    pub fn group_id(&self) -> &'static str {
        &self.inner.group_id
    }

    /// The artifact id. May contain `/` for sub-modules such as `firebase/app`.
    pub fn artifact_id(&self) -> &'static str {
        &self.inner.artifact_id
    }

    pub fn version(&self) -> &'static str {
        &self.inner.version
    }

    /// Whether this is the empty sentinel coordinate.
    pub fn is_empty(&self) -> bool {
        self.inner.group_id.is_empty()
            && self.inner.artifact_id.is_empty()
            && self.inner.version.is_empty()
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.inner, state)
    }
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner
            .group_id
            .cmp(&other.inner.group_id)
            .then_with(|| self.inner.artifact_id.cmp(&other.inner.artifact_id))
            .then_with(|| self.inner.version.cmp(&other.inner.version))
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Coordinate::empty()
    }
}

impl fmt::Debug for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coordinate({})", self)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.version.is_empty() {
            write!(f, "{}:{}", self.inner.group_id, self.inner.artifact_id)
        } else {
            write!(
                f,
                "{}:{}:{}",
                self.inner.group_id, self.inner.artifact_id, self.inner.version
            )
        }
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coordinate::parse(s)
    }
}

impl Serialize for Coordinate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Coordinate::parse(&text).map_err(serde::de::Error::custom)
    }
}
