//! Friendly control names to device controls.
//!
//! Callers address camera controls by snake_case aliases; devices expect
//! their own control names and value types. Translation coerces numeric
//! types, resolves enum names through closed tables, and passes unrecognized
//! keys through verbatim so advanced device controls stay reachable.
//!
//! A known enum control with an unknown value name is *dropped*, never
//! forwarded — the device must not receive a value it cannot interpret. The
//! dropped names are returned to the caller so the rejection is visible.

use crate::error::{BenchError, BenchResult};
use crate::hardware::camera::ControlValue;
use std::collections::HashMap;

/// Closed name tables for enum-valued controls. Values are the device's
/// wire encoding.
const AF_MODES: &[(&str, i64)] = &[("manual", 0), ("auto", 1), ("continuous", 2)];
const AF_TRIGGERS: &[(&str, i64)] = &[("start", 0), ("cancel", 1)];
const AWB_MODES: &[(&str, i64)] = &[
    ("auto", 0),
    ("incandescent", 1),
    ("tungsten", 2),
    ("fluorescent", 3),
    ("indoor", 4),
    ("daylight", 5),
    ("cloudy", 6),
];
const NOISE_REDUCTION_MODES: &[(&str, i64)] = &[
    ("off", 0),
    ("fast", 1),
    ("high_quality", 2),
    ("minimal", 3),
    ("zsl", 4),
];

/// Result of translating one control set.
#[derive(Debug, Default)]
pub struct TranslatedControls {
    /// Device-name/value pairs ready to apply.
    pub device_controls: Vec<(String, ControlValue)>,
    /// Friendly keys whose enum value name was not in the closed table.
    pub dropped: Vec<String>,
}

fn enum_value(table: &[(&str, i64)], value: &ControlValue) -> Option<i64> {
    match value {
        // Raw integers are trusted to be valid wire values.
        ControlValue::Int(i) => Some(*i),
        ControlValue::Text(name) => {
            let name = name.trim().to_ascii_lowercase();
            table
                .iter()
                .find(|(candidate, _)| *candidate == name)
                .map(|(_, code)| *code)
        }
        _ => None,
    }
}

fn require_i64(key: &str, value: &ControlValue) -> BenchResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| BenchError::ControlRejected(format!("'{}' expects an integer", key)))
}

fn require_f64(key: &str, value: &ControlValue) -> BenchResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| BenchError::ControlRejected(format!("'{}' expects a number", key)))
}

fn require_bool(key: &str, value: &ControlValue) -> BenchResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| BenchError::ControlRejected(format!("'{}' expects a boolean", key)))
}

/// Translate a friendly control map into device controls.
///
/// Coercion failure on a known key is `ControlRejected` — the caller named
/// the control explicitly, so a bad value must not be swallowed. An empty
/// input produces an empty translation (a no-op at the session layer).
pub fn translate(controls: &HashMap<String, ControlValue>) -> BenchResult<TranslatedControls> {
    let mut out = TranslatedControls::default();

    for (key, value) in controls {
        match key.as_str() {
            "exposure_time" => out.device_controls.push((
                "ExposureTime".to_string(),
                ControlValue::Int(require_i64(key, value)?),
            )),
            "analogue_gain" | "analog_gain" => out.device_controls.push((
                "AnalogueGain".to_string(),
                ControlValue::Float(require_f64(key, value)?),
            )),
            "ae_enable" => out.device_controls.push((
                "AeEnable".to_string(),
                ControlValue::Bool(require_bool(key, value)?),
            )),
            "awb_enable" => out.device_controls.push((
                "AwbEnable".to_string(),
                ControlValue::Bool(require_bool(key, value)?),
            )),
            "ev" | "exposure_value" => out.device_controls.push((
                "ExposureValue".to_string(),
                ControlValue::Float(require_f64(key, value)?),
            )),
            "lens_position" => out.device_controls.push((
                "LensPosition".to_string(),
                ControlValue::Float(require_f64(key, value)?),
            )),
            "af_mode" => match enum_value(AF_MODES, value) {
                Some(code) => out
                    .device_controls
                    .push(("AfMode".to_string(), ControlValue::Int(code))),
                None => out.dropped.push(key.clone()),
            },
            "af_trigger" => match enum_value(AF_TRIGGERS, value) {
                Some(code) => out
                    .device_controls
                    .push(("AfTrigger".to_string(), ControlValue::Int(code))),
                None => out.dropped.push(key.clone()),
            },
            "awb_mode" => match enum_value(AWB_MODES, value) {
                Some(code) => out
                    .device_controls
                    .push(("AwbMode".to_string(), ControlValue::Int(code))),
                None => out.dropped.push(key.clone()),
            },
            "noise_reduction_mode" => match enum_value(NOISE_REDUCTION_MODES, value) {
                Some(code) => out
                    .device_controls
                    .push(("NoiseReductionMode".to_string(), ControlValue::Int(code))),
                None => out.dropped.push(key.clone()),
            },
            "brightness" | "contrast" | "saturation" | "sharpness" => {
                let mut device_key = key.clone();
                if let Some(first) = device_key.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                out.device_controls
                    .push((device_key, ControlValue::Float(require_f64(key, value)?)));
            }
            // Unknown keys pass through verbatim.
            _ => out.device_controls.push((key.clone(), value.clone())),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(key: &str, value: ControlValue) -> HashMap<String, ControlValue> {
        let mut m = HashMap::new();
        m.insert(key.to_string(), value);
        m
    }

    fn single_control(key: &str, value: ControlValue) -> (String, ControlValue) {
        let translated = translate(&one(key, value)).unwrap();
        assert!(translated.dropped.is_empty());
        assert_eq!(translated.device_controls.len(), 1);
        translated.device_controls.into_iter().next().unwrap()
    }

    #[test]
    fn numeric_aliases_translate() {
        assert_eq!(
            single_control("exposure_time", ControlValue::Int(20_000)),
            ("ExposureTime".to_string(), ControlValue::Int(20_000))
        );
        assert_eq!(
            single_control("analog_gain", ControlValue::Int(2)),
            ("AnalogueGain".to_string(), ControlValue::Float(2.0))
        );
        assert_eq!(
            single_control("ae_enable", ControlValue::Bool(false)),
            ("AeEnable".to_string(), ControlValue::Bool(false))
        );
        assert_eq!(
            single_control("brightness", ControlValue::Float(0.25)),
            ("Brightness".to_string(), ControlValue::Float(0.25))
        );
    }

    #[test]
    fn enum_names_resolve_through_closed_tables() {
        assert_eq!(
            single_control("af_mode", ControlValue::from("continuous")),
            ("AfMode".to_string(), ControlValue::Int(2))
        );
        assert_eq!(
            single_control("awb_mode", ControlValue::from(" Daylight ")),
            ("AwbMode".to_string(), ControlValue::Int(5))
        );
        assert_eq!(
            single_control("noise_reduction_mode", ControlValue::from("zsl")),
            ("NoiseReductionMode".to_string(), ControlValue::Int(4))
        );
    }

    #[test]
    fn raw_integer_enum_values_pass_through() {
        assert_eq!(
            single_control("awb_mode", ControlValue::Int(3)),
            ("AwbMode".to_string(), ControlValue::Int(3))
        );
    }

    #[test]
    fn unknown_enum_name_is_dropped_and_surfaced() {
        let translated = translate(&one("awb_mode", ControlValue::from("sunset"))).unwrap();
        assert!(translated.device_controls.is_empty());
        assert_eq!(translated.dropped, vec!["awb_mode".to_string()]);
    }

    #[test]
    fn unknown_key_passes_through_verbatim() {
        assert_eq!(
            single_control("ScalerCrop", ControlValue::from("0,0,1920,1080")),
            (
                "ScalerCrop".to_string(),
                ControlValue::from("0,0,1920,1080")
            )
        );
    }

    #[test]
    fn bad_value_type_for_known_key_is_rejected() {
        let err = translate(&one("exposure_time", ControlValue::from("bright")))
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("exposure_time"));
    }

    #[test]
    fn empty_set_translates_to_empty() {
        let translated = translate(&HashMap::new()).unwrap();
        assert!(translated.device_controls.is_empty());
        assert!(translated.dropped.is_empty());
    }
}
