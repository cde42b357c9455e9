//! Shared helpers for command handlers.

use std::sync::Arc;
use std::time::Duration;

use amotion_core::{DeviceSnapshot, Field, FieldValue, Session, SnapshotStream};

use crate::error::CliError;

/// Wait until the cache holds any state.
pub async fn wait_for_snapshot(
    updates: &mut SnapshotStream,
    timeout_secs: u64,
) -> Result<Arc<DeviceSnapshot>, CliError> {
    let wait = async {
        loop {
            let latest = updates.latest();
            if !latest.is_empty() {
                return Ok(latest);
            }
            if updates.changed().await.is_none() {
                return Err(CliError::Internal("state cache closed".into()));
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(timeout_secs), wait)
        .await
        .map_err(|_| CliError::Timeout { seconds: timeout_secs })?
}

/// Wait until the unit has answered everything sent so far.
///
/// Also makes sure queued frames leave the process before shutdown.
pub async fn wait_for_answer(session: &Session, timeout_secs: u64) -> Result<(), CliError> {
    let wait = async {
        while session.unacknowledged_sends().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(timeout_secs), wait)
        .await
        .map_err(|_| CliError::Timeout { seconds: timeout_secs })
}

/// Value with its unit, for tables.
pub fn format_value(field: Field, value: &FieldValue) -> String {
    match (field, value) {
        (f, FieldValue::Number(n)) if f.is_temperature() => format!("{n:.1} °C"),
        (Field::FanPowerReq | Field::FanPowerReqSup | Field::FanPowerReqEta, FieldValue::Number(n)) => {
            format!("{n:.0} %")
        }
        _ => value.to_string(),
    }
}

pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_carry_units() {
        assert_eq!(format_value(Field::TempIda, &FieldValue::Number(21.46)), "21.5 °C");
        assert_eq!(format_value(Field::FanPowerReqSup, &FieldValue::Number(40.0)), "40 %");
        assert_eq!(format_value(Field::WorkRegime, &FieldValue::Text("AUTO".into())), "AUTO");
    }
}
