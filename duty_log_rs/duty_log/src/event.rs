use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// One route instruction from the trip planner.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RouteEvent {
    pub day: u32,
    #[serde(rename = "duration", alias = "duration_minutes")]
    pub duration_minutes: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub halt_type: String,
    #[serde(rename = "current_location", alias = "location", default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl RouteEvent {
    pub fn new(day: u32, duration_minutes: f64, halt_type: &str) -> Self {
        Self {
            day,
            duration_minutes,
            halt_type: halt_type.to_string(),
            location: None,
            description: String::new(),
        }
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TripPlan {
    #[serde(default)]
    pub id: Option<JsonValue>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub number_of_days: Option<u32>,
    pub route_instructions: Vec<RouteEvent>,
}

/// A trip document as served upstream: either the full trip object or a
/// bare list of route instructions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TripDocument {
    Events(Vec<RouteEvent>),
    Trip(TripPlan),
}

impl TripDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn events(&self) -> &[RouteEvent] {
        match self {
            TripDocument::Trip(plan) => &plan.route_instructions,
            TripDocument::Events(events) => events,
        }
    }

    pub fn plan(&self) -> Option<&TripPlan> {
        match self {
            TripDocument::Trip(plan) => Some(plan),
            TripDocument::Events(_) => None,
        }
    }

    /// Trip id rendered without JSON quoting.
    pub fn id_label(&self) -> Option<String> {
        match self.plan()?.id.as_ref()? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_object_with_upstream_names() {
        let doc = TripDocument::from_slice(
            br#"{
                "id": 11,
                "distance": 812.4,
                "number_of_days": 2,
                "route_instructions": [
                    {"day": 1, "duration": 90, "halt_type": "DRIVE",
                     "current_location": "Denver, CO (39.7392, -104.9903)",
                     "description": "Drive to pickup"},
                    {"day": 2, "duration": 30, "halt_type": "STOP",
                     "current_location": null, "description": null}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.id_label().as_deref(), Some("11"));
        assert_eq!(doc.events().len(), 2);
        assert_eq!(doc.events()[0].duration_minutes, 90.0);
        assert!(doc.events()[1].location.is_none());
        assert_eq!(doc.events()[1].description, "");
    }

    #[test]
    fn test_bare_event_list_with_aliases() {
        let doc = TripDocument::from_slice(
            br#"[{"day": 1, "duration_minutes": 60, "halt_type": "SLEEPER", "location": "Yard"}]"#,
        )
        .unwrap();
        assert!(doc.plan().is_none());
        assert_eq!(doc.events()[0].location.as_deref(), Some("Yard"));
        assert_eq!(doc.events()[0].halt_type, "SLEEPER");
    }
}
