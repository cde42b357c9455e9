// ── Flat device snapshot ──
//
// Both `ui_info` response bodies and `ui_info` event payloads carry the
// same nested sections. `SnapshotUpdate::from_ui_info` flattens either
// into one key space so the cache never cares where an update came from.

use std::collections::BTreeMap;
use std::fmt;

use amotion_api::models::{ActiveState, UiInfo};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

// ── Field ────────────────────────────────────────────────────────────

/// A named value tracked in the snapshot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    TempSup,
    TempEha,
    TempEta,
    TempIda,
    TempOda,
    TempOdaMean,
    FanEtaFactor,
    FanSupFactor,
    ModeCurrent,
    SeasonCurrent,
    BypassControlReq,
    FanPowerReq,
    FanPowerReqEta,
    FanPowerReqSup,
    Setpoint,
    WorkRegime,
}

/// Which section of a `ui_info` body a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Unit,
    Requests,
}

impl Field {
    pub fn section(self) -> Section {
        match self {
            Self::TempSup
            | Self::TempEha
            | Self::TempEta
            | Self::TempIda
            | Self::TempOda
            | Self::TempOdaMean
            | Self::FanEtaFactor
            | Self::FanSupFactor
            | Self::ModeCurrent
            | Self::SeasonCurrent => Section::Unit,
            Self::BypassControlReq
            | Self::FanPowerReq
            | Self::FanPowerReqEta
            | Self::FanPowerReqSup
            | Self::Setpoint
            | Self::WorkRegime => Section::Requests,
        }
    }

    /// Key inside the wire section.
    pub fn wire_key(self) -> &'static str {
        match self {
            Self::Setpoint => "temp_request",
            other => other.into(),
        }
    }

    /// Temperatures in °C.
    pub fn is_temperature(self) -> bool {
        matches!(
            self,
            Self::TempSup
                | Self::TempEha
                | Self::TempEta
                | Self::TempIda
                | Self::TempOda
                | Self::TempOdaMean
                | Self::Setpoint
        )
    }
}

// ── FieldValue ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    /// `None` for JSON `null`. Nested values are kept as their JSON text.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Some(Self::Text(value.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

// ── SnapshotUpdate ───────────────────────────────────────────────────

/// A partial overlay. Only fields listed here are touched by a merge;
/// `None` unsets a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotUpdate {
    pub fields: Vec<(Field, Option<FieldValue>)>,
    /// Replaces the whole active-state table when present.
    pub active_states: Option<BTreeMap<String, ActiveState>>,
}

impl SnapshotUpdate {
    pub fn from_ui_info(info: &UiInfo) -> Self {
        let empty = Map::new();
        let unit = info.unit.as_ref().unwrap_or(&empty);
        let requests = info.requests.as_ref().unwrap_or(&empty);

        let fields = Field::iter()
            .filter_map(|field| {
                let section = match field.section() {
                    Section::Unit => unit,
                    Section::Requests => requests,
                };
                section
                    .get(field.wire_key())
                    .map(|value| (field, FieldValue::from_json(value)))
            })
            .collect();

        Self {
            fields,
            active_states: info.states.as_ref().and_then(|s| s.active.clone()),
        }
    }

    pub fn set(mut self, field: Field, value: FieldValue) -> Self {
        self.fields.push((field, Some(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.active_states.is_none()
    }
}

// ── DeviceSnapshot ───────────────────────────────────────────────────

/// Last-known device state. Read-only to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    fields: BTreeMap<Field, FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_states: Option<BTreeMap<String, ActiveState>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl DeviceSnapshot {
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    /// Populated fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn active_states(&self) -> Option<&BTreeMap<String, ActiveState>> {
        self.active_states.as_ref()
    }

    /// Names of the states currently flagged active.
    pub fn active_state_names(&self) -> Vec<&str> {
        self.active_states
            .iter()
            .flat_map(|states| states.iter())
            .filter(|(_, state)| state.active)
            .map(|(key, state)| state.name.as_deref().unwrap_or(key))
            .collect()
    }

    /// When the last merge happened.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.active_states.is_none()
    }

    /// Overlay `update`. Returns whether any value changed.
    pub(crate) fn apply(&mut self, update: SnapshotUpdate) -> bool {
        let mut changed = false;
        for (field, value) in update.fields {
            changed |= match value {
                Some(value) => self.fields.insert(field, value.clone()) != Some(value),
                None => self.fields.remove(&field).is_some(),
            };
        }
        if let Some(states) = update.active_states {
            changed |= self.active_states.as_ref() != Some(&states);
            self.active_states = Some(states);
        }
        changed
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}
