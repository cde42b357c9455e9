// ── Command API ──
//
// Everything a consumer can ask the unit to change goes through
// `Command`. The session turns it into one `control` (or raw) request.

use amotion_api::{Args, Endpoint};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumIter, EnumString};

use crate::error::CoreError;

/// Operating program of the unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum WorkRegime {
    Off,
    Auto,
    Ventilation,
    NightPrecooling,
    Disbalance,
}

/// Values for the `control` endpoint. Unset fields are left untouched
/// by the unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlVariables {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_regime: Option<WorkRegime>,
    /// Setpoint in °C.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_request: Option<f64>,
    /// Fan power in percent, both directions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_power_req: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_power_req_sup: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_power_req_eta: Option<u8>,
}

const SETPOINT_RANGE: std::ops::RangeInclusive<f64> = 0.0..=50.0;

impl ControlVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work_regime(mut self, regime: WorkRegime) -> Self {
        self.work_regime = Some(regime);
        self
    }

    pub fn temperature(mut self, celsius: f64) -> Self {
        self.temp_request = Some(celsius);
        self
    }

    pub fn fan_power(mut self, percent: u8) -> Self {
        self.fan_power_req = Some(percent);
        self
    }

    pub fn fan_power_supply(mut self, percent: u8) -> Self {
        self.fan_power_req_sup = Some(percent);
        self
    }

    pub fn fan_power_extract(mut self, percent: u8) -> Self {
        self.fan_power_req_eta = Some(percent);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "no control variable set".into(),
            });
        }
        if let Some(t) = self.temp_request {
            if !t.is_finite() || !SETPOINT_RANGE.contains(&t) {
                return Err(CoreError::ValidationFailed {
                    message: format!(
                        "temperature {t} outside {}..={} °C",
                        SETPOINT_RANGE.start(),
                        SETPOINT_RANGE.end()
                    ),
                });
            }
        }
        for (name, value) in [
            ("fan_power_req", self.fan_power_req),
            ("fan_power_req_sup", self.fan_power_req_sup),
            ("fan_power_req_eta", self.fan_power_req_eta),
        ] {
            if let Some(percent) = value.filter(|p| *p > 100) {
                return Err(CoreError::ValidationFailed {
                    message: format!("{name} must be 0-100, got {percent}"),
                });
            }
        }
        Ok(())
    }
}

/// A write operation against the unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Control(ControlVariables),
    /// Any other endpoint, with optional raw arguments.
    Raw { endpoint: String, args: Option<Value> },
}

impl Command {
    pub fn set_work_regime(regime: WorkRegime) -> Self {
        Self::Control(ControlVariables::new().work_regime(regime))
    }

    pub fn set_temperature(celsius: f64) -> Self {
        Self::Control(ControlVariables::new().temperature(celsius))
    }

    /// Supply fan power, as the fan entity of the unit sets it.
    pub fn set_fan_power(percent: u8) -> Self {
        Self::Control(ControlVariables::new().fan_power_supply(percent))
    }

    pub fn endpoint_name(&self) -> &str {
        match self {
            Self::Control(_) => Endpoint::Control.as_str(),
            Self::Raw { endpoint, .. } => endpoint,
        }
    }

    /// Validate and lower into wire parts.
    pub(crate) fn to_wire(&self) -> Result<(Endpoint, Args), CoreError> {
        match self {
            Self::Control(vars) => {
                vars.validate()?;
                Ok((Endpoint::Control, Args::Payload(json!({ "variables": vars }))))
            }
            Self::Raw { endpoint, args } => {
                if endpoint.trim().is_empty() {
                    return Err(CoreError::ValidationFailed {
                        message: "endpoint must not be empty".into(),
                    });
                }
                let args = args.clone().map_or(Args::Null, Args::Payload);
                Ok((Endpoint::from(endpoint.as_str()), args))
            }
        }
    }
}
