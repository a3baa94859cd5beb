// ── Item identity ──
//
// ItemId separates server-issued identifiers from the temporary ones a
// controller hands out for optimistic creates. The two never compare
// equal, whatever string the server chooses.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identifier of a mirrored item.
///
/// Anything decoded from the wire is `Remote`. `Local` ids only exist between
/// an optimistic create and the refetch that replaces it with server truth.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemId {
    Remote(String),
    Local { instance: Uuid, seq: u64 },
}

impl ItemId {
    pub fn as_remote(&self) -> Option<&str> {
        match self {
            Self::Remote(s) => Some(s),
            Self::Local { .. } => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(s) => write!(f, "{s}"),
            Self::Local { instance, seq } => write!(f, "local:{}:{seq}", instance.simple()),
        }
    }
}

impl FromStr for ItemId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::Remote(s.to_owned()))
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self::Remote(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::Remote(s.to_owned())
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::Remote)
    }
}

// ── Temporary id allocation ─────────────────────────────────────────

/// Per-controller allocator for `ItemId::Local`.
#[derive(Debug)]
pub(crate) struct LocalIds {
    instance: Uuid,
    next: AtomicU64,
}

impl LocalIds {
    pub(crate) fn new() -> Self {
        Self {
            instance: Uuid::new_v4(),
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn instance(&self) -> Uuid {
        self.instance
    }

    pub(crate) fn next(&self) -> ItemId {
        ItemId::Local {
            instance: self.instance,
            seq: self.next.fetch_add(1, Ordering::Relaxed),
        }
    }
}
