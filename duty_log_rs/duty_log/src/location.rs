use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const LOCATION_PATTERN: &str = r"^(.*)\s*\((-?\d+\.\d+),\s*(-?\d+\.\d+)\)$";

/// A location string split into its display name and optional coordinates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParsedLocation {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ParsedLocation {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

fn location_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(LOCATION_PATTERN).expect("valid location regex"))
}

/// Parse `"Name (lat, lon)"`. Missing or empty text yields `placeholder`;
/// anything that does not match keeps the original text as the name.
pub fn parse_location(text: Option<&str>, placeholder: &str) -> ParsedLocation {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => {
            return ParsedLocation {
                name: placeholder.to_string(),
                latitude: None,
                longitude: None,
            }
        }
    };

    if let Some(caps) = location_regex().captures(text) {
        let latitude = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
        let longitude = caps.get(3).and_then(|m| m.as_str().parse::<f64>().ok());
        if let (Some(lat), Some(lon)) = (latitude, longitude) {
            let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            return ParsedLocation {
                name: name.to_string(),
                latitude: Some(lat),
                longitude: Some(lon),
            };
        }
    }

    ParsedLocation {
        name: text.to_string(),
        latitude: None,
        longitude: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_coordinates() {
        let loc = parse_location(Some("Chicago, IL (41.8781, -87.6298)"), "Unknown");
        assert_eq!(loc.name, "Chicago, IL");
        assert_eq!(loc.coordinates(), Some((41.8781, -87.6298)));
    }

    #[test]
    fn test_parse_coordinates_without_name() {
        let loc = parse_location(Some("(-33.8688, 151.2093)"), "Unknown");
        assert_eq!(loc.name, "");
        assert_eq!(loc.latitude, Some(-33.8688));
        assert_eq!(loc.longitude, Some(151.2093));
    }

    #[test]
    fn test_parse_plain_text_keeps_original() {
        let loc = parse_location(Some("Rest area near exit 42"), "Unknown");
        assert_eq!(loc.name, "Rest area near exit 42");
        assert!(loc.coordinates().is_none());

        // integers are not accepted as coordinates
        let loc = parse_location(Some("Depot (41, -87)"), "Unknown");
        assert_eq!(loc.name, "Depot (41, -87)");
        assert!(loc.latitude.is_none());
    }

    #[test]
    fn test_parse_missing_uses_placeholder() {
        assert_eq!(parse_location(None, "Unknown").name, "Unknown");
        assert_eq!(
            parse_location(Some(""), "Unknown Location").name,
            "Unknown Location"
        );
    }
}
