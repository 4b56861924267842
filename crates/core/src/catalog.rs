//! Static lookup tables for regions, scenarios, models, treatments and FMO options
//!
//! The catalog drives both the data ingest (which files exist, which regions
//! sum to a statewide total) and the dashboard labels. It is built once at
//! startup and passed by reference; nothing here is global.
//!
//! # Alaska defaults
//!
//! - Fire management zones (12) summed to `AllFMZs`
//! - Level-2 ecoregions (6) summed to `AllEcoregions`
//! - Scenarios RCP 4.5 / 6.0 / 8.5
//! - Five CMIP5 models, averaged into `5modelavg`
//! - Treatments TX0 / TX1 / TX2
//! - FMO options Critical / Full / Modified / Limited

use serde::{Deserialize, Serialize};

use crate::cost::CostFactors;
use crate::error::{Error, Result};

/// Model code of the unweighted multi-model average.
pub const MODEL_AVG: &str = "5modelavg";

/// Scenario code used for historical (observed climate) rows.
pub const HISTORICAL_SCENARIO: &str = "historical";

/// Option code of the derived all-options cost total.
pub const TOTAL_OPTION: &str = "total";

/// Spatial prefix under which the per-FMO-option area files live.
pub const FMO_SPATIAL_PREFIX: &str = "FireManagementOptions";

/// A machine code with its human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Code used in file names and table keys
    pub code: String,
    /// Label shown on the dashboard
    pub label: String,
}

impl Entry {
    fn new(code: &str, label: &str) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
        }
    }
}

/// Family of sibling regions stored under one directory prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialGroup {
    /// Directory prefix (`FireManagementZones`, `EcoregionsLevel2`)
    pub prefix: String,
    /// Region code of the group's summed aggregate
    pub statewide: String,
    /// Label of the summed aggregate
    pub statewide_label: String,
    /// Member regions
    pub regions: Vec<Entry>,
}

impl SpatialGroup {
    /// Member region codes.
    pub fn region_codes(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|e| e.code.as_str())
    }

    /// True when `region` is a member (not the aggregate).
    #[must_use]
    pub fn contains(&self, region: &str) -> bool {
        self.regions.iter().any(|e| e.code == region)
    }
}

/// Immutable lookup tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Spatial groups in processing order
    pub spatial_groups: Vec<SpatialGroup>,
    /// Climate scenarios (future only)
    pub scenarios: Vec<Entry>,
    /// Climate models (future only); all of them feed the model average
    pub models: Vec<Entry>,
    /// Future fire management treatments
    pub treatments: Vec<Entry>,
    /// Fire management options with cost factors
    pub fmo_options: Vec<Entry>,
    /// Historical cost per acre by year and option
    pub cost_factors: CostFactors,
}

impl Catalog {
    /// Lookup tables for the Alaska JFSP runs.
    #[must_use]
    pub fn alaska() -> Self {
        let zones = [
            ("ChugachNationalForest", "Chugach National Forest"),
            ("CopperRiverArea", "Copper River Area"),
            ("DeltaArea", "Delta Area"),
            ("FairbanksArea", "Fairbanks Area"),
            ("GalenaZone", "Galena Zone"),
            ("KenaiKodiakArea", "Kenai-Kodiak Area"),
            ("MatSuArea", "Mat-Su Area"),
            ("MilitaryZone", "Military Zone"),
            ("SouthwestArea", "Southwest Area"),
            ("TananaZone", "Tanana Zone"),
            ("TokArea", "Tok Area"),
            ("UpperYukonZone", "Upper Yukon Zone"),
        ];
        let ecoregions = [
            ("AlaskaRangeTransition", "Alaska Range Transition"),
            ("ArcticTundra", "Arctic Tundra"),
            ("BeringTaiga", "Bering Taiga"),
            ("BeringTundra", "Bering Tundra"),
            ("IntermontaneBoreal", "Intermontane Boreal"),
            ("PacificMountainsTransition", "Pacific Mountains Transition"),
        ];

        Self {
            spatial_groups: vec![
                SpatialGroup {
                    prefix: "FireManagementZones".to_string(),
                    statewide: "AllFMZs".to_string(),
                    statewide_label: "Statewide (all fire management zones)".to_string(),
                    regions: zones.iter().map(|(c, l)| Entry::new(c, l)).collect(),
                },
                SpatialGroup {
                    prefix: "EcoregionsLevel2".to_string(),
                    statewide: "AllEcoregions".to_string(),
                    statewide_label: "Statewide (all level 2 ecoregions)".to_string(),
                    regions: ecoregions.iter().map(|(c, l)| Entry::new(c, l)).collect(),
                },
            ],
            scenarios: vec![
                Entry::new("rcp45", "RCP 4.5"),
                Entry::new("rcp60", "RCP 6.0"),
                Entry::new("rcp85", "RCP 8.5"),
            ],
            models: ["CCSM4", "GFDL-CM3", "GISS-E2-R", "IPSL-CM5A-LR", "MRI-CGCM3"]
                .iter()
                .map(|m| Entry::new(m, m))
                .collect(),
            treatments: vec![
                Entry::new("gcm_tx0", "No change (TX0)"),
                Entry::new("gcm_tx1", "More Full Suppression (TX1)"),
                Entry::new("gcm_tx2", "No Full Suppression (TX2)"),
            ],
            fmo_options: vec![
                Entry::new("C", "Critical"),
                Entry::new("F", "Full"),
                Entry::new("M", "Modified"),
                Entry::new("L", "Limited"),
            ],
            cost_factors: CostFactors::alaska_2011_2017(),
        }
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns a configuration error when a list is empty, a statewide code
    /// collides with a member region, or an FMO option has no cost factor.
    pub fn validate(&self) -> Result<()> {
        if self.spatial_groups.is_empty() {
            return Err(Error::config("catalog has no spatial groups"));
        }
        for group in &self.spatial_groups {
            if group.regions.is_empty() {
                return Err(Error::config(format!(
                    "spatial group {} has no regions",
                    group.prefix
                )));
            }
            if group.contains(&group.statewide) {
                return Err(Error::config(format!(
                    "statewide code {} is also a member of {}",
                    group.statewide, group.prefix
                )));
            }
        }
        if self.scenarios.is_empty() || self.models.is_empty() || self.treatments.is_empty() {
            return Err(Error::config(
                "catalog needs at least one scenario, model and treatment",
            ));
        }
        if self.models.iter().any(|m| m.code == MODEL_AVG) {
            return Err(Error::config(format!(
                "{MODEL_AVG} is derived and cannot be listed as a model"
            )));
        }
        for option in &self.fmo_options {
            self.cost_factors.check_option(&option.code)?;
        }
        Ok(())
    }

    /// Model codes in catalog order.
    pub fn model_codes(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|e| e.code.as_str())
    }

    /// Scenario codes in catalog order.
    pub fn scenario_codes(&self) -> impl Iterator<Item = &str> {
        self.scenarios.iter().map(|e| e.code.as_str())
    }

    /// Treatment codes in catalog order.
    pub fn treatment_codes(&self) -> impl Iterator<Item = &str> {
        self.treatments.iter().map(|e| e.code.as_str())
    }

    /// FMO option codes in catalog order.
    pub fn option_codes(&self) -> impl Iterator<Item = &str> {
        self.fmo_options.iter().map(|e| e.code.as_str())
    }

    /// Dashboard label for a region or statewide code.
    #[must_use]
    pub fn region_label<'a>(&'a self, code: &'a str) -> &'a str {
        self.spatial_groups
            .iter()
            .find_map(|g| {
                if g.statewide == code {
                    Some(g.statewide_label.as_str())
                } else {
                    lookup(&g.regions, code)
                }
            })
            .unwrap_or(code)
    }

    /// Dashboard label for a scenario code.
    #[must_use]
    pub fn scenario_label<'a>(&'a self, code: &'a str) -> &'a str {
        if code == HISTORICAL_SCENARIO {
            return "Historical";
        }
        lookup(&self.scenarios, code).unwrap_or(code)
    }

    /// Dashboard label for a model code.
    #[must_use]
    pub fn model_label<'a>(&'a self, code: &'a str) -> &'a str {
        if code == MODEL_AVG {
            return "5-Model Average";
        }
        lookup(&self.models, code).unwrap_or(code)
    }

    /// Dashboard label for a treatment code.
    #[must_use]
    pub fn treatment_label<'a>(&'a self, code: &'a str) -> &'a str {
        lookup(&self.treatments, code).unwrap_or(code)
    }

    /// Dashboard label for an FMO option code.
    #[must_use]
    pub fn option_label<'a>(&'a self, code: &'a str) -> &'a str {
        if code == TOTAL_OPTION {
            return "Total";
        }
        lookup(&self.fmo_options, code).unwrap_or(code)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::alaska()
    }
}

fn lookup<'a>(entries: &'a [Entry], code: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|e| e.code == code)
        .map(|e| e.label.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alaska_catalog_is_valid() {
        let catalog = Catalog::alaska();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.models.len(), 5);
        assert_eq!(catalog.spatial_groups[0].regions.len(), 12);
        assert_eq!(catalog.spatial_groups[1].regions.len(), 6);
    }

    #[test]
    fn test_labels() {
        let catalog = Catalog::alaska();
        assert_eq!(catalog.region_label("KenaiKodiakArea"), "Kenai-Kodiak Area");
        assert_eq!(catalog.region_label("AllFMZs"), "Statewide (all fire management zones)");
        assert_eq!(catalog.scenario_label("rcp85"), "RCP 8.5");
        assert_eq!(catalog.model_label(MODEL_AVG), "5-Model Average");
        assert_eq!(catalog.treatment_label("gcm_tx1"), "More Full Suppression (TX1)");
        assert_eq!(catalog.option_label("M"), "Modified");
        // Unknown codes fall back to the code itself
        assert_eq!(catalog.region_label("Nowhere"), "Nowhere");
    }

    #[test]
    fn test_validate_rejects_statewide_collision() {
        let mut catalog = Catalog::alaska();
        catalog.spatial_groups[0].statewide = "TokArea".to_string();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_option_without_factors() {
        let mut catalog = Catalog::alaska();
        catalog.fmo_options.push(Entry::new("X", "Experimental"));
        assert!(matches!(
            catalog.validate(),
            Err(Error::UnknownCostOption(code)) if code == "X"
        ));
    }
}
