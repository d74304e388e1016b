//! Branded ID newtypes for type safety.
//!
//! Sessions and chunks get distinct ID types implemented as newtype wrappers
//! around `String`, so a chunk ID can never be passed where a session ID is
//! expected. Generated IDs are prefixed UUID v7 (time-ordered), e.g.
//! `sess-0192f3a1-…`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (prefixed UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(format!("{}-{}", $prefix, Uuid::now_v7()))
            }

            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a conversion session.
    SessionId, "sess"
}

branded_id! {
    /// Unique identifier for a chunk of translation work.
    ChunkId, "chunk"
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_has_prefix() {
        let id = SessionId::new();
        assert!(id.as_str().starts_with("sess-"));
    }

    #[test]
    fn chunk_id_has_prefix() {
        let id = ChunkId::new();
        assert!(id.as_str().starts_with("chunk-"));
    }

    #[test]
    fn generated_suffix_is_uuid_v7() {
        let id = SessionId::new();
        let suffix = id.as_str().strip_prefix("sess-").unwrap();
        let parsed = Uuid::parse_str(suffix).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn from_str_ref() {
        let id = ChunkId::from("chunk-abc");
        assert_eq!(id.as_str(), "chunk-abc");
    }

    #[test]
    fn serde_roundtrip() {
        let id = SessionId::from("sess-serde");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sess-serde\"");
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display() {
        let id = ChunkId::from("chunk-display");
        assert_eq!(format!("{id}"), "chunk-display");
    }
}
