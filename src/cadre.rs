//! Cadre levels and the "Unmapped" sentinel.
//!
//! The set of cadres is closed: operator input and persisted mappings are
//! parsed into [`Cadre`], so free-text typos never reach the data.

use crate::error::{Result, WranglerError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Cell value written for designations with no cadre yet.
pub const UNMAPPED: &str = "Unmapped";

/// Name of the derived column added by the classifier.
pub const CADRE_COLUMN: &str = "Cadre";

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cadre {
    DistrictLevel,
    FederalLevel,
    ProvincialLevel,
    TownLevel,
    UcLevel,
}

impl Cadre {
    /// Choices offered to the operator, in display order.
    pub const ALL: [Cadre; 5] = [
        Cadre::DistrictLevel,
        Cadre::FederalLevel,
        Cadre::ProvincialLevel,
        Cadre::TownLevel,
        Cadre::UcLevel,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Cadre::DistrictLevel => "District Level",
            Cadre::FederalLevel => "Federal Level",
            Cadre::ProvincialLevel => "Provincial Level",
            Cadre::TownLevel => "Town Level",
            Cadre::UcLevel => "UC Level",
        }
    }

    /// Closest cadre label to a mistyped entry, if any is close enough.
    pub fn closest(text: &str) -> Option<Cadre> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        Cadre::ALL
            .iter()
            .map(|c| (*c, strsim::jaro_winkler(&needle, &c.label().to_lowercase())))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(c, _)| c)
    }
}

impl fmt::Display for Cadre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Cadre {
    type Err = WranglerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Cadre::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| WranglerError::UnknownCadre(s.to_string()))
    }
}

impl Serialize for Cadre {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Cadre {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Result of looking a designation up in the mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Mapped(Cadre),
    Unmapped,
}

impl Assignment {
    pub fn label(&self) -> &'static str {
        match self {
            Assignment::Mapped(cadre) => cadre.label(),
            Assignment::Unmapped => UNMAPPED,
        }
    }

    pub fn cadre(&self) -> Option<Cadre> {
        match self {
            Assignment::Mapped(cadre) => Some(*cadre),
            Assignment::Unmapped => None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Assignment::Mapped(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!("District Level".parse::<Cadre>().unwrap(), Cadre::DistrictLevel);
        assert_eq!("  uc level ".parse::<Cadre>().unwrap(), Cadre::UcLevel);
        assert!("Unmapped".parse::<Cadre>().is_err());
        assert!("Regional Level".parse::<Cadre>().is_err());
    }

    #[test]
    fn test_closest_suggestion() {
        assert_eq!(Cadre::closest("Town Levl"), Some(Cadre::TownLevel));
        assert_eq!(Cadre::closest("provincal level"), Some(Cadre::ProvincialLevel));
        assert_eq!(Cadre::closest("xyz"), None);
        assert_eq!(Cadre::closest(""), None);
    }

    #[test]
    fn test_assignment_labels() {
        assert_eq!(Assignment::Mapped(Cadre::FederalLevel).label(), "Federal Level");
        assert_eq!(Assignment::Unmapped.label(), UNMAPPED);
        assert!(!Assignment::Unmapped.is_mapped());
    }
}
