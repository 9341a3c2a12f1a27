use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a resource kind (energy, a mineral, a compound...). Cheap to
/// copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKind(pub u32);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

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
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id! {
    /// Identifies a carrying agent. Re-resolved through the world every run;
    /// never a live handle.
    AgentId
}

string_id! {
    /// Identifies a transfer request. Unique within one operating area.
    RequestId
}

string_id! {
    /// Identifies a world object (structure, buffer, relay) that a transfer
    /// starts or ends at.
    TargetId
}
