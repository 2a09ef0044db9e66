use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($name:ident, $repr:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            pub const fn value(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// Game-assigned wire identifiers. These come from the server, never from us.
define_id!(ZoneId, u32);
define_id!(DialogId, i64);
define_id!(OverlayId, i64);

impl std::str::FromStr for ZoneId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_inner_value() {
        assert_eq!(ZoneId::new(7).to_string(), "7");
        assert_eq!(DialogId::new(-1).to_string(), "-1");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = ZoneId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let back: ZoneId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_parse_zone_id() {
        let id: ZoneId = "19".parse().unwrap();
        assert_eq!(id, ZoneId::new(19));
        assert!("x19".parse::<ZoneId>().is_err());
    }
}
