use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::geo::GeoPoint;

const MAX_DESCRIPTION_LENGTH: usize = 1000;
const MAX_TAGS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingImage {
    pub url: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub location: String,
    pub country: Option<String>,
    #[serde(default)]
    pub image: Vec<ListingImage>,
    pub geometry: GeoPoint,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub liked_by: Vec<ObjectId>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner: Option<ObjectId>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

/// Create/update payload. The raw `location` string is geocoded server-side;
/// clients never submit coordinates directly.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingInput {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub location: String,
    pub country: Option<String>,
    pub tags: Option<Vec<String>>,
    pub owner: Option<String>,
}

impl ListingInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.location.trim().is_empty() {
            return Err("Location is required".to_string());
        }
        if let Some(description) = &self.description {
            if description.len() > MAX_DESCRIPTION_LENGTH {
                return Err(format!(
                    "Maximum {} characters allowed for description",
                    MAX_DESCRIPTION_LENGTH
                ));
            }
        }
        if self.normalized_tags().len() > MAX_TAGS {
            return Err(format!("Maximum {} tags are allowed", MAX_TAGS));
        }
        Ok(())
    }

    /// Trims each tag and drops empty entries.
    pub fn normalized_tags(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ListingInput {
        ListingInput {
            title: "Seaside Villa".to_string(),
            description: Some("A villa by the sea".to_string()),
            price: Some(120.0),
            location: "Calangute, Goa".to_string(),
            country: Some("India".to_string()),
            tags: Some(vec!["Beach".to_string(), " Pool ".to_string()]),
            owner: None,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_rejects_blank_title_and_location() {
        let mut blank_title = input();
        blank_title.title = "   ".to_string();
        assert!(blank_title.validate().is_err());

        let mut blank_location = input();
        blank_location.location = String::new();
        assert!(blank_location.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_description() {
        let mut oversized = input();
        oversized.description = Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1));
        assert!(oversized.validate().is_err());
    }

    #[test]
    fn test_rejects_too_many_tags() {
        let mut tagged = input();
        tagged.tags = Some(vec![
            "Beach".to_string(),
            "Pool".to_string(),
            "Lake".to_string(),
            "Farms".to_string(),
        ]);
        assert!(tagged.validate().is_err());
    }

    #[test]
    fn test_tags_are_trimmed_and_filtered() {
        assert_eq!(input().normalized_tags(), vec!["Beach", "Pool"]);

        let mut empty_tag = input();
        empty_tag.tags = Some(vec!["  ".to_string(), "Forest".to_string()]);
        assert_eq!(empty_tag.normalized_tags(), vec!["Forest"]);
    }
}
