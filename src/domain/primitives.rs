//! Domain primitives: TimeMs and the typed identifiers.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    pub fn now() -> Self {
        TimeMs(Utc::now().timestamp_millis())
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// RFC 3339 rendering; falls back to the raw number when out of chrono's range.
    pub fn to_rfc3339(&self) -> String {
        match Utc.timestamp_millis_opt(self.0).single() {
            Some(dt) => dt.to_rfc3339(),
            None => self.0.to_string(),
        }
    }
}

impl From<DateTime<Utc>> for TimeMs {
    fn from(dt: DateTime<Utc>) -> Self {
        TimeMs(dt.timestamp_millis())
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new_v4() -> Self {
                $name(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Hyphenated lowercase form, as stored in SQLite.
            pub fn to_db(&self) -> String {
                self.0.hyphenated().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map($name)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a wallet owned by the wallet subsystem.
    WalletId
);
uuid_id!(
    /// Identifier of a transaction owned by the transaction subsystem.
    TransactionId
);
uuid_id!(ConfigurationId);
uuid_id!(TierId);
uuid_id!(HistoryId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timems_ordering() {
        assert!(TimeMs::new(1000) < TimeMs::new(2000));
    }

    #[test]
    fn test_timems_rfc3339() {
        assert_eq!(TimeMs::new(0).to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_id_roundtrips_through_db_form() {
        let id = WalletId::new_v4();
        let parsed = WalletId::from_str(&id.to_db()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ConfigurationId::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"67e55044-10b1-426f-9247-bb680e5fe0c8\"");
    }
}
