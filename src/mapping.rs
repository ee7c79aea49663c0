//! Designation -> cadre mapping table.
//!
//! A table is owned by one session and passed by reference into the
//! classifier and reconciler. It starts from the seed list and grows as the
//! operator classifies new designations.

use crate::cadre::{Assignment, Cadre};
use crate::error::{Result, WranglerError};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Designations known before any operator input.
///
/// Two keys appear twice with different cadres; `from_seed` reports them as
/// conflicts instead of silently keeping one.
pub const SEED_MAPPINGS: &[(&str, &str)] = &[
    ("District NSTOP Officer", "District Level"),
    ("DCO/DHCSO", "District Level"),
    ("Disease Surveillance Officer", "District Level"),
    ("Immunization Officer", "District Level"),
    ("Federal/Provincial/District Facilitator", "District Level"),
    ("Divisional NSTOP Officer", "District Level"),
    ("ComNET staff", "District Level"),
    ("Area Coordinator / District Coordinator", "District Level"),
    ("Provincial Facilitator (M&E, Campaign, HRMP, etc.)", "District Level"),
    ("DDHO", "District Level"),
    ("CEO/DHO", "District Level"),
    ("DSV / ASV", "District Level"),
    ("Federal Facilitator (UNICEF)", "Federal Level"),
    ("EPI Coordinator", "Provincial Level"),
    ("Provincial Facilitator (EPI, Coordinator etc)", "Provincial Level"),
    ("Federal/Provincial/District Facilitator", "Provincial Level"),
    ("TPO/ TDO", "Town Level"),
    ("ComNET staff", "Town Level"),
    ("TCO", "Town Level"),
    ("UCPO / UCSP/ UCDO", "UC Level"),
    ("UCMO", "UC Level"),
    ("TTSP/TUSP", "UC Level"),
    ("Social Mobilizers", "UC Level"),
    ("Independent Monitor", "UC Level"),
];

/// A seed key claimed by more than one cadre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConflict {
    pub designation: String,
    pub claims: Vec<Cadre>,
}

#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    /// Keys listed more than once with the same cadre.
    pub repeated: Vec<String>,
    /// Keys left out of the table because their seed entries disagree.
    pub conflicts: Vec<SeedConflict>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingTable {
    entries: IndexMap<String, Cadre>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table built from [`SEED_MAPPINGS`].
    pub fn seeded() -> Result<(Self, SeedReport)> {
        Self::from_seed(SEED_MAPPINGS)
    }

    /// Build a table from literal pairs, validating duplicate keys.
    pub fn from_seed(pairs: &[(&str, &str)]) -> Result<(Self, SeedReport)> {
        let mut claims: IndexMap<String, Vec<Cadre>> = IndexMap::new();
        for (designation, label) in pairs {
            let cadre: Cadre = label.parse()?;
            claims.entry(designation.to_string()).or_default().push(cadre);
        }

        let mut table = Self::new();
        let mut report = SeedReport::default();
        for (designation, cadres) in claims {
            let first = cadres[0];
            if cadres.iter().all(|c| *c == first) {
                if cadres.len() > 1 {
                    report.repeated.push(designation.clone());
                }
                table.entries.insert(designation, first);
            } else {
                warn!(
                    "Seed designation '{}' is claimed by {:?}; leaving it for manual mapping",
                    designation,
                    cadres.iter().map(|c| c.label()).collect::<Vec<_>>()
                );
                report.conflicts.push(SeedConflict { designation, claims: cadres });
            }
        }

        info!(
            "Loaded {} seed mappings ({} conflicting keys excluded)",
            table.len(),
            report.conflicts.len()
        );
        Ok((table, report))
    }

    pub fn lookup(&self, designation: &str) -> Assignment {
        match self.entries.get(designation) {
            Some(cadre) => Assignment::Mapped(*cadre),
            None => Assignment::Unmapped,
        }
    }

    /// Insert or overwrite a mapping. Returns the previous cadre, if any.
    pub fn upsert(&mut self, designation: impl Into<String>, cadre: Cadre) -> Option<Cadre> {
        self.entries.insert(designation.into(), cadre)
    }

    pub fn contains(&self, designation: &str) -> bool {
        self.entries.contains_key(designation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Cadre)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// JSON object of designation -> cadre label, four-space indented.
    pub fn export_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| WranglerError::Export(e.to_string()))
    }

    pub fn parse_json(text: &str) -> Result<Self> {
        let entries: IndexMap<String, Cadre> = serde_json::from_str(text)?;
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let table = Self::parse_json(&content)?;
        info!("Loaded {} mappings from {}", table.len(), path.as_ref().display());
        Ok(table)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.export_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_flags_conflicting_keys() {
        let (table, report) = MappingTable::seeded().unwrap();

        assert_eq!(table.len(), 20);
        assert_eq!(report.conflicts.len(), 2);
        assert!(report.repeated.is_empty());

        let conflicted: Vec<&str> = report.conflicts.iter().map(|c| c.designation.as_str()).collect();
        assert!(conflicted.contains(&"ComNET staff"));
        assert!(conflicted.contains(&"Federal/Provincial/District Facilitator"));
        assert_eq!(table.lookup("ComNET staff"), Assignment::Unmapped);
    }

    #[test]
    fn test_seed_collapses_identical_repeats() {
        let (table, report) = MappingTable::from_seed(&[
            ("TCO", "Town Level"),
            ("TCO", "Town Level"),
        ])
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(report.repeated, vec!["TCO".to_string()]);
    }

    #[test]
    fn test_seed_rejects_unknown_label() {
        let err = MappingTable::from_seed(&[("X", "Village Level")]).unwrap_err();
        assert!(matches!(err, WranglerError::UnknownCadre(_)));
    }

    #[test]
    fn test_lookup_seeded_designation() {
        let (table, _) = MappingTable::seeded().unwrap();
        assert_eq!(table.lookup("DDHO"), Assignment::Mapped(Cadre::DistrictLevel));
        assert_eq!(table.lookup("Nurse Supervisor"), Assignment::Unmapped);
    }

    #[test]
    fn test_upsert_overwrites() {
        let mut table = MappingTable::new();
        assert_eq!(table.upsert("UCMO", Cadre::TownLevel), None);
        assert_eq!(table.upsert("UCMO", Cadre::UcLevel), Some(Cadre::TownLevel));
        assert_eq!(table.lookup("UCMO"), Assignment::Mapped(Cadre::UcLevel));
    }

    #[test]
    fn test_export_json_shape() {
        let mut table = MappingTable::new();
        table.upsert("DDHO", Cadre::DistrictLevel);
        table.upsert("UCMO", Cadre::UcLevel);

        let json = table.export_json().unwrap();
        assert_eq!(
            json,
            "{\n    \"DDHO\": \"District Level\",\n    \"UCMO\": \"UC Level\"\n}"
        );
        assert_eq!(MappingTable::parse_json(&json).unwrap(), table);
    }

    #[test]
    fn test_parse_rejects_sentinel() {
        assert!(MappingTable::parse_json(r#"{"DDHO": "Unmapped"}"#).is_err());
    }
}
