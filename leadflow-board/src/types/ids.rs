//! Strongly typed identifiers
//!
//! Every identifier wraps a `String`. Locally minted ids are ULIDs; ids that
//! come from the backend are accepted verbatim through `from_string`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh ULID-based id
            pub fn new() -> Self {
                Self(ulid::Ulid::new().to_string())
            }

            /// Wrap an existing id string
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id!(
    /// Identifier of a lead (work item)
    LeadId
);
define_id!(
    /// Identifier of a stage (column)
    StageId
);
define_id!(
    /// Identifier of a pipeline
    PipelineId
);
define_id!(
    /// Identifier of an activity log entry
    LogEntryId
);
