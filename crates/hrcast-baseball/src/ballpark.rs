// Ballpark reference data: home-run park factors and stadium coordinates.

use serde::Deserialize;
use std::collections::HashMap;

/// Park factor applied when a ballpark is not in the table.
pub const NEUTRAL_PARK_FACTOR: f64 = 1.0;

/// Static facts about one ballpark.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Ballpark {
    /// Home-run park factor (1.0 = neutral).
    pub hr_factor: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Read-only lookup table of ballparks keyed by lowercase name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "HashMap<String, Ballpark>")]
pub struct BallparkTable {
    parks: HashMap<String, Ballpark>,
}

impl From<HashMap<String, Ballpark>> for BallparkTable {
    fn from(raw: HashMap<String, Ballpark>) -> Self {
        let parks = raw
            .into_iter()
            .map(|(name, park)| (normalize_park(&name), park))
            .collect();
        Self { parks }
    }
}

impl BallparkTable {
    pub fn new(parks: impl IntoIterator<Item = (String, Ballpark)>) -> Self {
        Self::from(parks.into_iter().collect::<HashMap<_, _>>())
    }

    pub fn get(&self, name: &str) -> Option<&Ballpark> {
        self.parks.get(&normalize_park(name))
    }

    /// HR park factor for `name`, or [`NEUTRAL_PARK_FACTOR`] if unknown.
    pub fn park_factor(&self, name: &str) -> f64 {
        self.get(name)
            .map(|p| p.hr_factor)
            .unwrap_or(NEUTRAL_PARK_FACTOR)
    }

    /// Latitude/longitude of `name`, if known.
    pub fn coordinates(&self, name: &str) -> Option<(f64, f64)> {
        self.get(name).map(|p| (p.lat, p.lon))
    }

    /// Ballpark names sorted by descending park factor, then name.
    pub fn ranked(&self) -> Vec<(&str, &Ballpark)> {
        let mut out: Vec<(&str, &Ballpark)> =
            self.parks.iter().map(|(k, v)| (k.as_str(), v)).collect();
        out.sort_by(|a, b| {
            b.1.hr_factor
                .partial_cmp(&a.1.hr_factor)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Ballpark)> {
        self.parks.iter()
    }

    pub fn len(&self) -> usize {
        self.parks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parks.is_empty()
    }
}

fn normalize_park(name: &str) -> String {
    name.trim().to_lowercase()
}
