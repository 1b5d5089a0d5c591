//! Type-safe ID generation.
//!
//! Every ID is a prefixed string (`exec_<uuid>`), so a raw column value in
//! the database is self-describing.

use serde::{Deserialize, Serialize};

/// Macro to define new ID types with minimal boilerplate
#[macro_export]
macro_rules! define_id_type {
    ($type_name:ident, $prefix:expr) => {
        #[derive(
            Debug,
            PartialEq,
            Eq,
            Hash,
            Clone,
            ::serde::Serialize,
            ::serde::Deserialize,
            ::schemars::JsonSchema,
        )]
        pub struct $type_name(pub String);

        impl $type_name {
            pub const PREFIX: &'static str = $prefix;

            pub fn generate() -> Self {
                $type_name(format!(
                    "{}_{}",
                    Self::PREFIX,
                    ::uuid::Uuid::new_v4().simple()
                ))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $type_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $type_name {
            fn from(s: String) -> Self {
                $type_name(s)
            }
        }

        impl From<&str> for $type_name {
            fn from(s: &str) -> Self {
                $type_name(s.to_string())
            }
        }
    };
}

define_id_type!(AgentId, "agent");
define_id_type!(ExecutionId, "exec");
define_id_type!(EventId, "event");
define_id_type!(MemoryId, "mem");

/// Conversation IDs are derived, not generated: `platform:user_id`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Build the canonical conversation key for a platform/user pair.
    pub fn for_user(platform: &str, user_id: &str) -> Self {
        Self(format!("{}:{}", platform, user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
