//! Type-safe identifier wrappers around positive `i64` keys.
//!
//! Every stored record has a strongly-typed ID to prevent accidental mixing
//! of identifiers at compile time. The store assigns keys from its own
//! sequences, so these wrappers never generate values; they only validate
//! and carry them.

use serde::{Deserialize, Serialize};

/// Returned when a raw key is not a valid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("identifier must be a positive integer, got {0}")]
pub struct InvalidId(pub i64);

/// Generates a newtype wrapper around a positive `i64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw key, rejecting zero and negative values.
            pub const fn try_new(raw: i64) -> Result<Self, InvalidId> {
                if raw > 0 {
                    Ok(Self(raw))
                } else {
                    Err(InvalidId(raw))
                }
            }

            /// Return the inner key.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = InvalidId;

            fn try_from(raw: i64) -> Result<Self, Self::Error> {
                Self::try_new(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a user (requester or event creator).
    UserId
}

define_id! {
    /// Unique identifier for an event.
    EventId
}

define_id! {
    /// Unique identifier for a single ticket (one unit of inventory).
    TicketId
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_keys() {
        assert_eq!(EventId::try_new(0), Err(InvalidId(0)));
        assert_eq!(UserId::try_new(-7), Err(InvalidId(-7)));
        assert_eq!(TicketId::try_new(1).map(TicketId::get), Ok(1));
    }

    #[test]
    fn deserialize_validates() {
        let ok: EventId = serde_json::from_str("42").unwrap();
        assert_eq!(ok.get(), 42);

        let bad: Result<EventId, _> = serde_json::from_str("0");
        assert!(bad.is_err());
    }

    #[test]
    fn serializes_as_bare_integer() {
        let id = UserId::try_new(1001).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "1001");
    }
}
