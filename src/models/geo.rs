use serde::{Deserialize, Serialize};

/// GeoJSON point stored on every listing, `[longitude, latitude]` order.
/// The `type` tag is what MongoDB's 2dsphere index expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    point_type: PointType,
    coordinates: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum PointType {
    Point,
}

// New Delhi, used whenever geocoding cannot produce a better answer.
const DEFAULT_COORDINATES: [f64; 2] = [77.2090, 28.6139];

impl GeoPoint {
    /// Builds a point, rejecting out-of-range coordinates.
    pub fn new(longitude: f64, latitude: f64) -> Option<Self> {
        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return None;
        }
        Some(Self {
            point_type: PointType::Point,
            coordinates: [longitude, latitude],
        })
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self {
            point_type: PointType::Point,
            coordinates: DEFAULT_COORDINATES,
        }
    }
}
