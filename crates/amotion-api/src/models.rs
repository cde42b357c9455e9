// Wire payload shapes shared by the WebSocket and onboarding APIs.
//
// Bodies are deliberately loose: the unit only sends the sections and
// keys that changed, so every section is optional and field maps stay
// untyped until the core normalizes them.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Body of a `ui_info` response, and the `args` of a `ui_info` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiInfo {
    /// Measured values: temperatures, fan factors, current mode and season.
    #[serde(default, deserialize_with = "lenient_section")]
    pub unit: Option<Map<String, Value>>,

    /// Requested values: work regime, setpoint, fan power, bypass.
    #[serde(default, deserialize_with = "lenient_section")]
    pub requests: Option<Map<String, Value>>,

    #[serde(default, deserialize_with = "lenient_section")]
    pub states: Option<UiStates>,
}

impl UiInfo {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiStates {
    /// Alarm and interval states keyed by state name. Entries that do
    /// not parse are skipped.
    #[serde(default, deserialize_with = "lenient_active")]
    pub active: Option<BTreeMap<String, ActiveState>>,
}

/// One entry of `states.active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveState {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// Identity of the unit, from the `discovery` endpoint of either API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryInfo {
    /// Model name, e.g. `"aMotion"`. Sent as `type`.
    #[serde(rename = "type", default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub production_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub board_number: Option<String>,
}

/// A section of the wrong shape decodes as absent instead of failing
/// the whole body.
fn lenient_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(value) => match T::deserialize(value) {
            Ok(section) => Some(section),
            Err(e) => {
                warn!(error = %e, "ignoring malformed ui_info section");
                None
            }
        },
    })
}

fn lenient_active<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, ActiveState>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(entries) = lenient_section::<D, Map<String, Value>>(deserializer)? else {
        return Ok(None);
    };
    let states = entries
        .into_iter()
        .filter_map(|(key, value)| match ActiveState::deserialize(value) {
            Ok(state) => Some((key, state)),
            Err(e) => {
                warn!(state = %key, error = %e, "ignoring malformed active state");
                None
            }
        })
        .collect();
    Ok(Some(states))
}

/// Accept a string or a bare number; some firmware sends serials unquoted.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn ui_info_sections_are_optional() {
        let info = UiInfo::from_value(json!({ "unit": { "temp_ida": 21.4 } })).unwrap();
        assert_eq!(info.unit.unwrap()["temp_ida"], json!(21.4));
        assert!(info.requests.is_none());
        assert!(info.states.is_none());
    }

    #[test]
    fn ui_info_active_states() {
        let info = UiInfo::from_value(json!({
            "states": { "active": { "filter_warning": { "active": true, "name": "Filter" } } }
        }))
        .unwrap();
        let active = info.states.unwrap().active.unwrap();
        assert_eq!(
            active["filter_warning"],
            ActiveState {
                active: true,
                name: Some("Filter".into())
            }
        );
    }

    #[test]
    fn malformed_sections_do_not_discard_the_rest() {
        let info = UiInfo::from_value(json!({
            "unit": { "temp_ida": 21.4 },
            "requests": "garbage",
            "states": { "active": {
                "105": null,
                "106": { "active": true, "name": "FILTER_INTERVAL" },
                "107": { "active": "maybe" }
            } }
        }))
        .unwrap();

        assert_eq!(info.unit.unwrap()["temp_ida"], json!(21.4));
        assert!(info.requests.is_none());
        let active = info.states.unwrap().active.unwrap();
        assert_eq!(active.keys().collect::<Vec<_>>(), vec!["106"]);
    }

    #[test]
    fn states_of_the_wrong_shape_are_absent() {
        let info = UiInfo::from_value(json!({
            "unit": { "temp_oda": 3.5 },
            "states": "unavailable"
        }))
        .unwrap();
        assert!(info.states.is_none());
        assert_eq!(info.unit.unwrap()["temp_oda"], json!(3.5));
    }

    #[test]
    fn discovery_renames_type() {
        let info: DiscoveryInfo = serde_json::from_value(json!({
            "type": "aMotion",
            "version": "1.2.3",
            "production_number": "P-1",
            "board_number": "B-7"
        }))
        .unwrap();
        assert_eq!(info.model.as_deref(), Some("aMotion"));
        assert_eq!(info.board_number.as_deref(), Some("B-7"));
    }

    #[test]
    fn discovery_accepts_numeric_serials() {
        let info: DiscoveryInfo =
            serde_json::from_value(json!({ "production_number": 12345, "version": null })).unwrap();
        assert_eq!(info.production_number.as_deref(), Some("12345"));
        assert_eq!(info.version, None);
        assert_eq!(info.model, None);
    }
}
