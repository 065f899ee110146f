// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::HealaError;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// How many hospitals the home screen lists.
pub const NEAREST_COUNT: usize = 3;
pub const NO_PHONE_MESSAGE: &str = "This hospital doesn't have a phone number listed.";

/// Great-circle distance in kilometres between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + lat1.to_radians().cos()
            * lat2.to_radians().cos()
            * (d_lon / 2.0).sin()
            * (d_lon / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HospitalRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: String,
}

impl HospitalRecord {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.latitude?, self.longitude?))
    }

    /// Number to dial, or the notice shown when none is listed.
    pub fn contact_phone(&self) -> Result<&str, HealaError> {
        self.phone
            .as_deref()
            .ok_or_else(|| HealaError::ValidationError(NO_PHONE_MESSAGE.to_string()))
    }
}

/// Bundled data mixes numbers and numeric strings for coordinates.
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let value = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(v)) => Some(v),
        Some(Raw::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// A hospital annotated with its distance from the device.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedHospital {
    #[serde(flatten)]
    pub hospital: HospitalRecord,
    /// `None` when either the device location or the hospital coordinate is unknown.
    #[serde(rename = "distance")]
    pub distance_km: Option<f64>,
}

impl RankedHospital {
    /// Short line under the hospital name: distance when known, else the location.
    pub fn summary(&self) -> String {
        match self.distance_km {
            Some(d) => format!("{} away", format_distance(d)),
            None => self.hospital.location.clone(),
        }
    }
}

/// Annotate each hospital with its distance from `origin` and sort ascending.
/// Unknown distances sort last and keep their input order.
pub fn rank_hospitals(
    hospitals: Vec<HospitalRecord>,
    origin: Option<Coordinate>,
) -> Vec<RankedHospital> {
    let mut ranked: Vec<RankedHospital> = hospitals
        .into_iter()
        .map(|hospital| {
            let distance_km = origin
                .zip(hospital.coordinate())
                .map(|(from, to)| from.distance_km(&to));
            RankedHospital {
                hospital,
                distance_km,
            }
        })
        .collect();

    ranked.sort_by(|a, b| compare_distance(a.distance_km, b.distance_km));
    ranked
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-insensitive substring match on name or location.
pub fn filter_hospitals<'a>(ranked: &'a [RankedHospital], query: &str) -> Vec<&'a RankedHospital> {
    let query = query.to_lowercase();
    ranked
        .iter()
        .filter(|r| {
            r.hospital.name.to_lowercase().contains(&query)
                || r.hospital.location.to_lowercase().contains(&query)
        })
        .collect()
}

/// First `n` hospitals with a known distance. Expects ranked input.
pub fn nearest(ranked: &[RankedHospital], n: usize) -> Vec<&RankedHospital> {
    ranked
        .iter()
        .filter(|r| r.distance_km.is_some())
        .take(n)
        .collect()
}

/// Hospitals to list: the search narrows the ranked list first, then
/// `nearest` keeps the closest matches with a known distance.
pub fn select_hospitals<'a>(
    ranked: &'a [RankedHospital],
    search: Option<&str>,
    nearest: Option<usize>,
) -> Vec<&'a RankedHospital> {
    let matching = match search {
        Some(query) => filter_hospitals(ranked, query),
        None => ranked.iter().collect(),
    };
    match nearest {
        Some(n) => matching
            .into_iter()
            .filter(|r| r.distance_km.is_some())
            .take(n)
            .collect(),
        None => matching,
    }
}

pub fn format_distance(km: f64) -> String {
    format!("{km:.1} km")
}

pub fn load_hospitals(json: &str) -> Result<Vec<HospitalRecord>, HealaError> {
    let hospitals: Vec<HospitalRecord> = serde_json::from_str(json)
        .map_err(|e| HealaError::ValidationError(format!("Invalid hospital list: {e}")))?;
    debug!("Parsed {} hospitals", hospitals.len());
    Ok(hospitals)
}

pub async fn load_hospitals_file(path: impl AsRef<Path>) -> Result<Vec<HospitalRecord>, HealaError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        HealaError::ConfigError(format!("Failed to read {}: {e}", path.display()))
    })?;
    let hospitals = load_hospitals(&json)?;
    info!("Loaded {} hospitals from {}", hospitals.len(), path.display());
    Ok(hospitals)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const COLOMBO: Coordinate = Coordinate {
        latitude: 6.9271,
        longitude: 79.8612,
    };

    const HOSPITALS: &str = r#"[
        {"id": 1, "name": "National Hospital", "location": "Colombo 10", "latitude": "6.9192", "longitude": "79.8676", "phone": "0112691111", "status": "Government"},
        {"id": 2, "name": "Rural Clinic", "location": "Hambantota", "latitude": "", "longitude": "", "phone": "", "status": "Government"},
        {"id": "3", "name": "Teaching Hospital Kandy", "location": "Kandy", "latitude": 7.2871, "longitude": 80.6320, "status": "Government"},
        {"id": 4, "name": "Lanka Hospitals", "location": "Narahenpita", "latitude": 6.8935, "longitude": 79.8780},
        {"id": 5, "name": "Base Hospital", "location": "Colombo North", "status": "Government"}
    ]"#;

    #[test]
    fn test_zero_and_symmetric() {
        assert_eq!(haversine_km(6.9, 79.8, 6.9, 79.8), 0.0);
        let pairs = [
            ((6.9271, 79.8612), (7.2906, 80.6337)),
            ((51.5, -0.12), (40.71, -74.0)),
            ((-33.86, 151.2), (35.68, 139.69)),
        ];
        for ((a_lat, a_lon), (b_lat, b_lon)) in pairs {
            let ab = haversine_km(a_lat, a_lon, b_lat, b_lon);
            let ba = haversine_km(b_lat, b_lon, a_lat, a_lon);
            assert!((ab - ba).abs() < 1e-9);
            assert!(ab > 0.0);
        }
    }

    #[test]
    fn test_antipodal() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - PI * EARTH_RADIUS_KM).abs() < 1e-6);
        let d = haversine_km(90.0, 0.0, -90.0, 0.0);
        assert!((d - PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_known_distance() {
        // Colombo to Kandy is roughly 94 km as the crow flies.
        let d = COLOMBO.distance_km(&Coordinate::new(7.2906, 80.6337));
        assert!((90.0..100.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_lenient_parsing() {
        let hospitals = load_hospitals(HOSPITALS).unwrap();
        assert_eq!(hospitals.len(), 5);
        assert_eq!(hospitals[0].latitude, Some(6.9192));
        assert_eq!(hospitals[1].coordinate(), None);
        assert_eq!(hospitals[1].phone, None);
        assert_eq!(hospitals[2].id, "3");
        assert_eq!(hospitals[3].status, "");
        assert_eq!(hospitals[4].latitude, None);

        assert_eq!(hospitals[0].contact_phone().unwrap(), "0112691111");
        assert_eq!(
            hospitals[1].contact_phone().unwrap_err(),
            HealaError::ValidationError(NO_PHONE_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_unknown_distances_sort_last_in_order() {
        let ranked = rank_hospitals(load_hospitals(HOSPITALS).unwrap(), Some(COLOMBO));
        let ids: Vec<&str> = ranked.iter().map(|r| r.hospital.id.as_str()).collect();
        assert_eq!(ids, ["1", "4", "3", "2", "5"]);

        let known: Vec<f64> = ranked.iter().filter_map(|r| r.distance_km).collect();
        assert!(known.windows(2).all(|w| w[0] <= w[1]));
        assert!(ranked[0].summary().ends_with(" km away"));
        assert_eq!(ranked[4].summary(), "Colombo North");
    }

    #[test]
    fn test_no_location_keeps_input_order() {
        let ranked = rank_hospitals(load_hospitals(HOSPITALS).unwrap(), None);
        assert!(ranked.iter().all(|r| r.distance_km.is_none()));
        let ids: Vec<&str> = ranked.iter().map(|r| r.hospital.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5"]);
        assert!(nearest(&ranked, NEAREST_COUNT).is_empty());
    }

    #[test]
    fn test_filter_and_nearest() {
        let ranked = rank_hospitals(load_hospitals(HOSPITALS).unwrap(), Some(COLOMBO));

        let colombo: Vec<&str> = filter_hospitals(&ranked, "COLOMBO")
            .iter()
            .map(|r| r.hospital.id.as_str())
            .collect();
        assert_eq!(colombo, ["1", "5"]);
        assert_eq!(filter_hospitals(&ranked, "kandy").len(), 1);
        assert_eq!(filter_hospitals(&ranked, "").len(), 5);

        let near = nearest(&ranked, NEAREST_COUNT);
        assert_eq!(near.len(), 3);
        assert!(near.iter().all(|r| r.distance_km.is_some()));
        assert_eq!(nearest(&ranked, 10).len(), 3);
    }

    #[test]
    fn test_nearest_respects_search() {
        let ranked = rank_hospitals(load_hospitals(HOSPITALS).unwrap(), Some(COLOMBO));
        let ids = |shown: Vec<&RankedHospital>| -> Vec<String> {
            shown.iter().map(|r| r.hospital.id.clone()).collect()
        };

        // "Base Hospital" matches but has no coordinates.
        assert_eq!(ids(select_hospitals(&ranked, Some("colombo"), Some(3))), ["1"]);
        assert_eq!(ids(select_hospitals(&ranked, Some("kandy"), Some(3))), ["3"]);
        assert!(select_hospitals(&ranked, Some("galle"), Some(3)).is_empty());
        assert_eq!(ids(select_hospitals(&ranked, None, Some(2))), ["1", "4"]);
        assert_eq!(ids(select_hospitals(&ranked, Some("colombo"), None)), ["1", "5"]);
        assert_eq!(select_hospitals(&ranked, None, None).len(), 5);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(3.04), "3.0 km");
        assert_eq!(format_distance(12.36), "12.4 km");
    }

    #[test]
    fn test_bundled_list() {
        let hospitals = load_hospitals(include_str!("../../../../../data/hospitals.json")).unwrap();
        let ranked = rank_hospitals(hospitals, Some(COLOMBO));
        assert_eq!(ranked.last().unwrap().distance_km, None);
        assert_eq!(nearest(&ranked, NEAREST_COUNT).len(), 3);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            load_hospitals("{\"not\": \"a list\"}"),
            Err(HealaError::ValidationError(_))
        ));
    }
}
