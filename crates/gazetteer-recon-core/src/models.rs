//! Core data models shared by the scorer, ranking engine, and server.
//!
//! The gazetteer holds a single entity type, so every [`Entity`] is a
//! `City` and every [`Match`] carries the same one-element type list.

use serde::{Deserialize, Serialize};

/// Identifier of the only entity type this service reconciles against.
pub const CITY_TYPE_ID: &str = "city";
/// Display name of the only entity type.
pub const CITY_TYPE_NAME: &str = "City";

/// A reconciliation candidate loaded from a gazetteer dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// Stable identifier; the name when the source row had none.
    pub id: String,
    /// Display name and match target. Never empty.
    pub name: String,
    /// Always [`CITY_TYPE_NAME`].
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Region qualifier, empty when the source row had none.
    pub province: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Entity {
    /// Build a city entity. An empty `id` falls back to `name`.
    pub fn city(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let id = id.into();
        Self {
            id: if id.is_empty() { name.clone() } else { id },
            name,
            entity_type: CITY_TYPE_NAME.to_string(),
            province: String::new(),
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = province.into();
        self
    }

    pub fn with_coordinates(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }
}

/// `{id, name}` reference to an entity type, as used in manifests and results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub id: String,
    pub name: String,
}

impl TypeRef {
    pub fn city() -> Self {
        Self {
            id: CITY_TYPE_ID.to_string(),
            name: CITY_TYPE_NAME.to_string(),
        }
    }
}

/// One scored candidate in a reconciliation result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub name: String,
    /// Confidence in `0..=100`.
    pub score: u32,
    /// True when the score clears the match threshold.
    #[serde(rename = "match")]
    pub is_match: bool,
    #[serde(rename = "type")]
    pub types: Vec<TypeRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_id_falls_back_to_name() {
        let e = Entity::city("", "Toronto");
        assert_eq!(e.id, "Toronto");
        assert_eq!(e.entity_type, "City");

        let e = Entity::city("t-1", "Toronto");
        assert_eq!(e.id, "t-1");
    }

    #[test]
    fn test_match_serializes_protocol_field_names() {
        let m = Match {
            id: "1".to_string(),
            name: "Ottawa".to_string(),
            score: 100,
            is_match: true,
            types: vec![TypeRef::city()],
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["match"], true);
        assert_eq!(json["type"][0]["id"], "city");
        assert_eq!(json["type"][0]["name"], "City");
        assert!(json.get("is_match").is_none());
    }

    #[test]
    fn test_entity_serializes_missing_coordinates_as_null() {
        let e = Entity::city("", "Banff").with_province("Alberta");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "City");
        assert_eq!(json["province"], "Alberta");
        assert!(json["latitude"].is_null());
        assert!(json["longitude"].is_null());
    }
}
