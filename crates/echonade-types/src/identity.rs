//! Identity types for Echonade
//!
//! Marketplace identities are integers assigned by the marketplace. They are
//! wrapped in distinct types so a job id can never be passed where an agent
//! entity id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Macro to generate numeric ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create from a raw marketplace id
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, ParseIntError> {
                let s = s.trim();
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(s.parse()?))
            }

            /// Get the raw id
            pub fn get(&self) -> u64 {
                self.0
            }

            /// Convert to prefixed string
            pub fn to_prefixed_string(&self) -> String {
                format!("{}_{}", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

define_id_type!(JobId, "job", "Unique identifier for a marketplace job");
define_id_type!(AgentId, "agent", "Marketplace entity id of an agent");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        assert_eq!(JobId::parse("101").unwrap(), JobId::new(101));
        assert_eq!(JobId::parse("job_101").unwrap(), JobId::new(101));
        assert_eq!(JobId::parse(" 7 ").unwrap(), JobId::new(7));
        assert!(JobId::parse("lemons").is_err());
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&JobId::new(42)).unwrap();
        assert_eq!(json, "42");
        assert_eq!(AgentId::new(3).to_prefixed_string(), "agent_3");
    }
}
