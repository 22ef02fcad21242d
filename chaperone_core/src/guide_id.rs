use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_program::pubkey::Pubkey;

use crate::error::CoreError;

/// Public identifier of a guide record: `<authority base58>-<index>`.
///
/// The pair is also the seed material of the guide PDA, so two ids are equal
/// exactly when they address the same on-chain account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuideId {
    pub authority: Pubkey,
    pub index: u64,
}

impl GuideId {
    pub fn new(authority: Pubkey, index: u64) -> Self {
        Self { authority, index }
    }
}

impl fmt::Display for GuideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.authority, self.index)
    }
}

impl FromStr for GuideId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidGuideId(s.to_string());
        // base58 never contains '-', so the last dash separates the index.
        let (authority, index) = s.rsplit_once('-').ok_or_else(invalid)?;
        let authority = Pubkey::from_str(authority).map_err(|_| invalid())?;
        let index = index.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self { authority, index })
    }
}

impl Serialize for GuideId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GuideId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_what_it_prints() {
        let id = GuideId::new(Pubkey::new_unique(), 42);
        let parsed: GuideId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("no-dash-here".parse::<GuideId>().is_err());
        assert!("GsjREUyUEkFRAhoSj1q9Tg4tPGCyoEAoTyFiZjqxKD92".parse::<GuideId>().is_err());
        assert!("GsjREUyUEkFRAhoSj1q9Tg4tPGCyoEAoTyFiZjqxKD92-x".parse::<GuideId>().is_err());
        assert!("demo1-0".parse::<GuideId>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let id: GuideId = "GsjREUyUEkFRAhoSj1q9Tg4tPGCyoEAoTyFiZjqxKD92-3".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"GsjREUyUEkFRAhoSj1q9Tg4tPGCyoEAoTyFiZjqxKD92-3\"");
        let back: GuideId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
