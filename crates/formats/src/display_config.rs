//! Region → city → district display configuration.
//!
//! The JSON form is a bare array of regions. Cities without usable
//! coordinates are kept in the tree but never resolved.

use std::collections::BTreeSet;

use foundation::math::LonLat;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayConfig {
    pub regions: Vec<RegionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    #[serde(default)]
    pub cities: Vec<CityConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<[f64; 2]>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub districts: Vec<DistrictConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictConfig {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// The city every flight link converges to, named explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubRef {
    pub region: String,
    pub city: String,
}

/// A city with validated coordinates and its parent region's name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCity {
    pub region: String,
    pub name: String,
    pub coordinates: LonLat,
    pub url: Option<String>,
    pub districts: Vec<DistrictConfig>,
}

#[derive(Debug)]
pub enum DisplayConfigError {
    Json(serde_json::Error),
}

impl std::fmt::Display for DisplayConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayConfigError::Json(e) => write!(f, "invalid display config: {e}"),
        }
    }
}

impl std::error::Error for DisplayConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DisplayConfigError::Json(e) => Some(e),
        }
    }
}

impl DisplayConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, DisplayConfigError> {
        serde_json::from_str(payload).map_err(DisplayConfigError::Json)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.iter().all(|r| r.cities.is_empty())
    }

    /// Cities in config order. Cities without valid coordinates are dropped;
    /// a city repeating an earlier city's coordinates is dropped with a
    /// warning.
    pub fn resolved_cities(&self) -> Vec<ResolvedCity> {
        let mut seen: BTreeSet<(u64, u64)> = BTreeSet::new();
        let mut out = Vec::new();
        for region in &self.regions {
            for city in &region.cities {
                let Some(coords) = city.coordinates.map(LonLat::from_array) else {
                    continue;
                };
                if !coords.is_valid() {
                    warn!(city = %city.name, "dropping city with out-of-range coordinates");
                    continue;
                }
                let key = (coords.lon_deg.to_bits(), coords.lat_deg.to_bits());
                if !seen.insert(key) {
                    warn!(city = %city.name, region = %region.name, "dropping city with duplicate coordinates");
                    continue;
                }
                out.push(ResolvedCity {
                    region: region.name.clone(),
                    name: city.name.clone(),
                    coordinates: coords,
                    url: city.url.clone(),
                    districts: city.districts.clone(),
                });
            }
        }
        out
    }

    /// Exact-name lookup of the hub among resolved cities.
    pub fn resolve_hub(&self, hub: &HubRef) -> Option<ResolvedCity> {
        self.resolved_cities()
            .into_iter()
            .find(|c| c.region == hub.region && c.name == hub.city)
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayConfig, DistrictConfig, HubRef};
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"[
        { "name": "Fujian", "cities": [
            { "name": "Ningde", "coordinates": [119.5, 26.6] },
            { "name": "Fuzhou", "coordinates": [119.3, 26.08], "url": "https://example.com/fz",
              "districts": [{ "name": "Gulou" }] },
            { "name": "Ghost" },
            { "name": "Twin", "coordinates": [119.5, 26.6] }
        ] },
        { "name": "Empty" }
    ]"#;

    #[test]
    fn resolves_cities_in_order_and_drops_unusable_ones() {
        let cfg = DisplayConfig::from_json_str(CONFIG).expect("config");
        let names: Vec<_> = cfg.resolved_cities().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Ningde".to_string(), "Fuzhou".to_string()]);
    }

    #[test]
    fn city_without_districts_has_empty_list() {
        let cfg = DisplayConfig::from_json_str(CONFIG).expect("config");
        let cities = cfg.resolved_cities();
        assert!(cities[0].districts.is_empty());
        assert_eq!(cities[0].url, None);
        assert_eq!(
            cities[1].districts,
            vec![DistrictConfig {
                name: "Gulou".into(),
                url: None
            }]
        );
    }

    #[test]
    fn hub_lookup_is_exact() {
        let cfg = DisplayConfig::from_json_str(CONFIG).expect("config");
        let hub = HubRef {
            region: "Fujian".into(),
            city: "Ningde".into(),
        };
        assert_eq!(cfg.resolve_hub(&hub).map(|c| c.coordinates.lon_deg), Some(119.5));
        let wrong = HubRef {
            region: "Fujian".into(),
            city: "ningde".into(),
        };
        assert!(cfg.resolve_hub(&wrong).is_none());
    }

    #[test]
    fn rejects_non_array_payload() {
        assert!(DisplayConfig::from_json_str("{\"regions\": 1}").is_err());
    }
}
