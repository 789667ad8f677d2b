//! Stable identifiers for cluster objects.
//!
//! An identity is encoded as `namespace/name`, or just `name` for
//! cluster-scoped objects. Kubernetes names never contain `/`, so the
//! encoding is unambiguous and round-trips for every valid pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Separator between namespace and name
pub const IDENTITY_SEPARATOR: char = '/';

/// Namespace and name of a cluster object
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId {
    /// Namespace, empty for cluster-scoped objects
    pub namespace: String,
    /// Name, unique within the namespace
    pub name: String,
}

impl ClaimId {
    /// Build an identity from a namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a cluster-scoped object
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self::new(String::new(), name)
    }

    /// True when the identity has no namespace
    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }

    /// Encoded form of this identity
    pub fn encode(&self) -> String {
        encode(&self.namespace, &self.name)
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}{}{}", self.namespace, IDENTITY_SEPARATOR, self.name)
        }
    }
}

impl FromStr for ClaimId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// Encode a namespace and name into an identity string
pub fn encode(namespace: &str, name: &str) -> String {
    ClaimId::new(namespace, name).to_string()
}

/// Decode an identity string into namespace and name
///
/// Accepts `namespace/name` or `name`. Empty segments and extra separators
/// are rejected with `MalformedIdentity`.
pub fn decode(id: &str) -> Result<ClaimId, Error> {
    let parts: Vec<&str> = id.split(IDENTITY_SEPARATOR).collect();
    match parts.as_slice() {
        [name] if !name.is_empty() => Ok(ClaimId::cluster_scoped(*name)),
        [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
            Ok(ClaimId::new(*namespace, *name))
        }
        [_] | [_, _] => Err(Error::malformed_identity(
            id,
            "namespace and name segments must not be empty",
        )),
        _ => Err(Error::malformed_identity(
            id,
            "expected \"namespace/name\" or \"name\"",
        )),
    }
}
