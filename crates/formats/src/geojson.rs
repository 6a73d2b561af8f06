//! GeoJSON `FeatureCollection` ingest for region boundaries.
//!
//! Only `Polygon` and `MultiPolygon` features are kept. Bad features and bad
//! rings are skipped and counted in [`IngestReport`]; only a payload that is
//! not a feature collection at all is an error.

use foundation::bounds::Aabb2;
use foundation::math::LonLat;
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeometryType {
    Polygon,
    MultiPolygon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub name: String,
    pub geometry_type: GeometryType,
    /// Every ring of every polygon, flattened.
    pub rings: Vec<Vec<LonLat>>,
    pub centroid: Option<LonLat>,
    pub properties: Map<String, Value>,
}

impl GeoFeature {
    pub fn coordinates(&self) -> impl Iterator<Item = LonLat> + '_ {
        self.rings.iter().flatten().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<GeoFeature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFeature {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub total: usize,
    pub accepted: usize,
    pub skipped: Vec<SkippedFeature>,
    pub dropped_rings: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    Json(String),
    NotAFeatureCollection,
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Json(e) => write!(f, "dataset is not valid JSON: {e}"),
            DatasetError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
        }
    }
}

impl std::error::Error for DatasetError {}

/// Hex blake3 digest of a raw payload, used as a cache key.
pub fn content_hash(payload: &str) -> String {
    blake3::hash(payload.as_bytes()).to_hex().to_string()
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<(Self, IngestReport), DatasetError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| DatasetError::Json(e.to_string()))?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<(Self, IngestReport), DatasetError> {
        let obj = value.as_object().ok_or(DatasetError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(DatasetError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(DatasetError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(DatasetError::NotAFeatureCollection)?;

        let mut report = IngestReport {
            total: features_val.len(),
            ..IngestReport::default()
        };
        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            match parse_feature(feat_val, &mut report.dropped_rings) {
                Ok(feature) => features.push(feature),
                Err(reason) => {
                    warn!(index, %reason, "skipping malformed feature");
                    report.skipped.push(SkippedFeature { index, reason });
                }
            }
        }
        report.accepted = features.len();
        Ok((Self { features }, report))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn bounds(&self) -> Aabb2 {
        let mut b = Aabb2::empty();
        for p in self.features.iter().flat_map(|f| f.coordinates()) {
            b.include([p.lon_deg, p.lat_deg]);
        }
        b
    }
}

/// Drops features reaching into polar latitudes (below -60 or above 85) or
/// with no valid coordinate. Falls back to the input when nothing survives.
pub fn filter_polar_regions(collection: &FeatureCollection) -> FeatureCollection {
    let kept: Vec<GeoFeature> = collection
        .features
        .iter()
        .filter(|f| {
            let mut lats = f.coordinates().filter(|p| p.is_valid()).map(|p| p.lat_deg);
            let Some(first) = lats.next() else {
                return false;
            };
            let (min, max) = lats.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
            min > -60.0 && max < 85.0
        })
        .cloned()
        .collect();
    if kept.is_empty() {
        return collection.clone();
    }
    FeatureCollection { features: kept }
}

fn parse_feature(value: &Value, dropped_rings: &mut usize) -> Result<GeoFeature, String> {
    let obj = value.as_object().ok_or("feature must be an object".to_string())?;
    let properties = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    let name = properties
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let centroid = properties
        .get("centroid")
        .and_then(|v| parse_position(v).ok())
        .filter(|p| p.is_valid());

    let geometry = obj
        .get("geometry")
        .and_then(|v| v.as_object())
        .ok_or("feature missing geometry".to_string())?;
    let ty = geometry
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;
    let coords = geometry
        .get("coordinates")
        .and_then(|v| v.as_array())
        .ok_or("geometry missing coordinates".to_string())?;

    let (geometry_type, raw_rings): (GeometryType, Vec<&Value>) = match ty {
        "Polygon" => (GeometryType::Polygon, coords.iter().collect()),
        "MultiPolygon" => (
            GeometryType::MultiPolygon,
            coords
                .iter()
                .filter_map(|poly| poly.as_array())
                .flatten()
                .collect(),
        ),
        other => return Err(format!("unsupported geometry type: {other}")),
    };

    let mut rings = Vec::with_capacity(raw_rings.len());
    for raw in raw_rings {
        match parse_ring(raw) {
            Ok(ring) => rings.push(ring),
            Err(reason) => {
                warn!(feature = %name, %reason, "dropping ring");
                *dropped_rings += 1;
            }
        }
    }
    if rings.is_empty() {
        return Err("feature has no usable rings".to_string());
    }

    Ok(GeoFeature {
        name,
        geometry_type,
        rings,
        centroid,
        properties,
    })
}

fn parse_ring(value: &Value) -> Result<Vec<LonLat>, String> {
    let arr = value.as_array().ok_or("ring must be an array".to_string())?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        let p = parse_position(item)?;
        if !p.is_valid() {
            return Err(format!("position out of range: [{}, {}]", p.lon_deg, p.lat_deg));
        }
        out.push(p);
    }
    if out.len() < 3 {
        return Err(format!("ring needs at least 3 positions, got {}", out.len()));
    }
    Ok(out)
}

fn parse_position(value: &Value) -> Result<LonLat, String> {
    let arr = value
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(LonLat::new(lon, lat))
}

#[cfg(test)]
mod tests {
    use super::{DatasetError, FeatureCollection, GeometryType, content_hash, filter_polar_regions};
    use serde_json::json;

    fn square(lon: f64, lat: f64, size: f64) -> serde_json::Value {
        json!([[
            [lon, lat],
            [lon + size, lat],
            [lon + size, lat + size],
            [lon, lat + size],
            [lon, lat]
        ]])
    }

    #[test]
    fn flattens_multipolygons_and_reads_properties() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "name": "Fujian", "centroid": [118.0, 26.0] },
                    "geometry": { "type": "MultiPolygon", "coordinates": [square(117.0, 25.0, 1.0), square(119.0, 25.0, 0.5)] }
                }
            ]
        });
        let (fc, report) = FeatureCollection::from_geojson_value(&value).expect("collection");
        assert_eq!(report.accepted, 1);
        let f = &fc.features[0];
        assert_eq!(f.name, "Fujian");
        assert_eq!(f.geometry_type, GeometryType::MultiPolygon);
        assert_eq!(f.rings.len(), 2);
        assert_eq!(f.centroid.map(|c| c.lon_deg), Some(118.0));
    }

    #[test]
    fn malformed_features_and_rings_are_skipped() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "name": "NoGeom" } },
                { "type": "Feature", "properties": { "name": "Point" }, "geometry": { "type": "Point", "coordinates": [1.0, 2.0] } },
                { "type": "Feature", "properties": { "name": "Partly" }, "geometry": { "type": "Polygon", "coordinates": [
                    [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
                    [[0.0, 0.0], ["x", 0.0], [1.0, 1.0]]
                ] } }
            ]
        });
        let (fc, report) = FeatureCollection::from_geojson_value(&value).expect("collection");
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].name, "Partly");
        assert_eq!(fc.features[0].rings.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.dropped_rings, 1);
    }

    #[test]
    fn non_collection_is_an_error() {
        assert_eq!(
            FeatureCollection::from_geojson_str("{\"type\":\"Feature\"}").unwrap_err(),
            DatasetError::NotAFeatureCollection
        );
        assert!(matches!(
            FeatureCollection::from_geojson_str("not json"),
            Err(DatasetError::Json(_))
        ));
    }

    #[test]
    fn polar_filter_drops_antarctica_but_never_empties() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "name": "Antarctica" }, "geometry": { "type": "Polygon", "coordinates": square(0.0, -80.0, 10.0) } },
                { "type": "Feature", "properties": { "name": "France" }, "geometry": { "type": "Polygon", "coordinates": square(2.0, 45.0, 3.0) } }
            ]
        });
        let (fc, _) = FeatureCollection::from_geojson_value(&value).expect("collection");
        let kept = filter_polar_regions(&fc);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.features[0].name, "France");

        let only_polar = FeatureCollection {
            features: vec![fc.features[0].clone()],
        };
        assert_eq!(filter_polar_regions(&only_polar).len(), 1);
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("abc").len(), 64);
    }
}
