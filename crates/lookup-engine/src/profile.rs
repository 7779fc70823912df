//! Preset configurations for the reference features

use crate::config::EngineConfig;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference feature a lookup is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureProfile {
    /// State statutes by title or code
    Statutes,
    /// Local ordinances by title, number or jurisdiction
    Ordinances,
    /// Traffic violations; local only
    TrafficViolations,
    /// Standard jury instructions by title or number
    JuryInstructions,
    /// Fish and wildlife regulations by species, gear, topic or license
    Regulations,
}

impl FeatureProfile {
    /// Every profile
    pub const ALL: [Self; 5] = [
        Self::Statutes,
        Self::Ordinances,
        Self::TrafficViolations,
        Self::JuryInstructions,
        Self::Regulations,
    ];

    /// Profile name as used on the command line
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Statutes => "statutes",
            Self::Ordinances => "ordinances",
            Self::TrafficViolations => "traffic-violations",
            Self::JuryInstructions => "jury-instructions",
            Self::Regulations => "regulations",
        }
    }

    /// Whether this feature has a generative fallback
    #[inline]
    #[must_use]
    pub fn uses_fallback(self) -> bool {
        !matches!(self, Self::TrafficViolations)
    }

    /// Engine configuration for this feature
    #[must_use]
    pub fn config(self) -> EngineConfig {
        let base = EngineConfig::default();
        match self {
            Self::Statutes => base.with_match_fields(["title", "code"]).with_category_priority([
                "Crimes Against Persons",
                "Property Crimes",
                "Drug Offenses",
                "Weapons Offenses",
                "Traffic Offenses",
                "Public Order & Obstruction",
            ]),
            Self::Ordinances => base.with_match_fields(["title", "number", "jurisdiction"]),
            Self::TrafficViolations => base
                .with_match_fields(["common_name", "statute_number", "statute_title"])
                .with_category_priority([
                    "Core Moving Violations",
                    "Equipment & Non-Moving Violations",
                    "License, Registration & Insurance Violations",
                    "Serious Bodily Injury / Fatality Violations",
                ]),
            Self::JuryInstructions => base.with_match_fields(["title", "number"]).with_category_priority([
                "Crimes Against Persons",
                "Property Crimes",
                "Drug Offenses",
                "Anticipatory Crimes",
                "Defenses",
            ]),
            Self::Regulations => base
                .with_match_fields([
                    "title",
                    "species_name",
                    "common_names",
                    "gear_name",
                    "topic",
                    "license_name",
                ])
                .with_category_priority(["Fishing", "Hunting", "Boating", "Species", "Licensing"]),
        }
    }
}

impl fmt::Display for FeatureProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureProfile {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::UnknownProfile(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_config_is_valid() {
        for profile in FeatureProfile::ALL {
            assert!(profile.config().validate().is_ok(), "{profile}");
        }
    }

    #[test]
    fn traffic_has_no_fallback() {
        assert!(!FeatureProfile::TrafficViolations.uses_fallback());
        assert!(FeatureProfile::Statutes.uses_fallback());
    }

    #[test]
    fn parse_by_name() {
        assert_eq!(
            "jury-instructions".parse::<FeatureProfile>().unwrap(),
            FeatureProfile::JuryInstructions
        );
        assert!(matches!(
            "recipes".parse::<FeatureProfile>(),
            Err(EngineError::UnknownProfile(_))
        ));
    }

    #[test]
    fn regulations_match_common_names_and_fall_back() {
        let profile: FeatureProfile = "regulations".parse().unwrap();
        assert_eq!(profile, FeatureProfile::Regulations);
        assert!(profile.uses_fallback());

        let items = vec![
            lookup_index::IndexItem::new("red-drum", "Fishing")
                .with_field("species_name", "Red Drum")
                .with_field("common_names", "Redfish, Channel Bass"),
            lookup_index::IndexItem::new("cast-net", "Fishing").with_field("gear_name", "Cast Net"),
        ];
        let matcher = profile.config().matcher();
        let found: Vec<&str> = matcher
            .matches("redfish", &items)
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(found, vec!["red-drum"]);
    }

    #[test]
    fn ordinance_fields() {
        let config = FeatureProfile::Ordinances.config();
        assert_eq!(config.match_fields, vec!["title", "number", "jurisdiction"]);
    }
}
