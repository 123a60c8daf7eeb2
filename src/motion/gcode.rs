//! Command grammar for Marlin/RepRap-style motion controllers.
//!
//! Builders for the small dialect the bench needs: absolute moves with
//! independent XY/Z feed rates, homing, origin set, emergency stop, and the
//! position report. Plus the `ok` acknowledgment predicate and the report
//! parser.

use std::collections::HashMap;

/// Acknowledgment token terminating a command's response.
pub const ACK_TOKEN: &str = "ok";

/// Query controller identity; consumed during the connect handshake.
pub const FIRMWARE_INFO: &str = "M115";
/// Millimeter units.
pub const UNITS_MM: &str = "G21";
/// Absolute positioning mode.
pub const ABSOLUTE_POSITIONING: &str = "G90";
/// Finish all queued moves before acknowledging.
pub const COMPLETION_BARRIER: &str = "M400";
/// Emergency stop. Halts the controller; no acknowledgment follows.
pub const EMERGENCY_STOP: &str = "M112";
/// Report current position.
pub const POSITION_REPORT: &str = "M114";

/// Absolute move on up to three axes.
#[derive(Clone, Copy, Debug)]
pub struct MoveTarget {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    /// Feed rate for the horizontal plane, controller units/min.
    pub feed_xy: u32,
    /// Feed rate for the vertical axis.
    pub feed_z: u32,
    /// Run the Z move before XY to clear obstacles. Whether that is the
    /// safe order depends on the rig; the caller decides.
    pub safe_z_first: bool,
    /// Append the completion barrier so the final acknowledgment means
    /// physical motion finished, not just command acceptance.
    pub wait_for_completion: bool,
}

impl Default for MoveTarget {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            z: None,
            feed_xy: 1000,
            feed_z: 100,
            safe_z_first: false,
            wait_for_completion: true,
        }
    }
}

impl MoveTarget {
    pub fn position(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            ..Self::default()
        }
    }
}

/// Build the command sequence for one move.
pub fn move_sequence(target: &MoveTarget) -> Vec<String> {
    let mut commands = vec![ABSOLUTE_POSITIONING.to_string()];

    let xy_line = {
        let mut parts = vec!["G0".to_string(), format!("F{}", target.feed_xy)];
        if let Some(x) = target.x {
            parts.push(format!("X{:.4}", x));
        }
        if let Some(y) = target.y {
            parts.push(format!("Y{:.4}", y));
        }
        (parts.len() > 2).then(|| parts.join(" "))
    };
    let z_line = target
        .z
        .map(|z| format!("G0 F{} Z{:.4}", target.feed_z, z));

    if target.safe_z_first && z_line.is_some() && xy_line.is_some() {
        commands.extend(z_line);
        commands.extend(xy_line);
    } else {
        commands.extend(xy_line);
        commands.extend(z_line);
    }

    if target.wait_for_completion {
        commands.push(COMPLETION_BARRIER.to_string());
    }
    commands
}

/// Build the homing sequence. `axes` is filtered to X/Y/Z; anything else is
/// ignored, and an empty selection homes all three.
pub fn home_sequence(axes: &str) -> Vec<String> {
    let mut selected: String = axes
        .to_ascii_uppercase()
        .chars()
        .filter(|c| matches!(c, 'X' | 'Y' | 'Z'))
        .collect();
    if selected.is_empty() {
        selected = "XYZ".to_string();
    }
    vec![
        format!("G28 {}", selected),
        ABSOLUTE_POSITIONING.to_string(),
    ]
}

/// Build the set-origin sequence: declare the current physical position to
/// be the given logical coordinates.
pub fn set_origin_sequence(x: f64, y: f64, z: f64) -> Vec<String> {
    vec![
        format!("G92 X{:.3} Y{:.3} Z{:.3}", x, y, z),
        ABSOLUTE_POSITIONING.to_string(),
    ]
}

/// True when `line` is the acknowledgment terminating a response.
pub fn is_ack(line: &str) -> bool {
    let line = line.trim().to_ascii_lowercase();
    line == ACK_TOKEN || line.ends_with(" ok")
}

/// Parse an `M114` report into lowercase axis keys.
///
/// A typical report is `X:50.00 Y:50.00 Z:10.00 E:0.00 Count X:4000 ...`;
/// the first occurrence of each key wins, so the stepper-count section never
/// clobbers the actual coordinates.
pub fn parse_position_report(lines: &[String]) -> HashMap<String, f64> {
    let mut values = HashMap::new();
    for line in lines {
        for token in line.split_whitespace() {
            if let Some((key, value)) = token.split_once(':') {
                if let Ok(value) = value.parse::<f64>() {
                    values.entry(key.to_ascii_lowercase()).or_insert(value);
                }
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_sequence_splits_feeds() {
        let target = MoveTarget {
            x: Some(50.0),
            y: Some(50.0),
            z: Some(10.0),
            feed_xy: 1200,
            feed_z: 80,
            safe_z_first: false,
            wait_for_completion: true,
        };
        assert_eq!(
            move_sequence(&target),
            vec![
                "G90",
                "G0 F1200 X50.0000 Y50.0000",
                "G0 F80 Z10.0000",
                "M400",
            ]
        );
    }

    #[test]
    fn safe_ordering_raises_z_first() {
        let target = MoveTarget {
            safe_z_first: true,
            ..MoveTarget::position(1.0, 2.0, 3.0)
        };
        let commands = move_sequence(&target);
        assert!(commands[1].contains("Z3.0000"));
        assert!(commands[2].contains("X1.0000"));
    }

    #[test]
    fn partial_axes_omit_empty_lines() {
        let target = MoveTarget {
            z: Some(5.0),
            wait_for_completion: false,
            ..MoveTarget::default()
        };
        assert_eq!(move_sequence(&target), vec!["G90", "G0 F100 Z5.0000"]);
    }

    #[test]
    fn home_sequence_sanitizes_axes() {
        assert_eq!(home_sequence("zx"), vec!["G28 ZX", "G90"]);
        assert_eq!(home_sequence("ab"), vec!["G28 XYZ", "G90"]);
    }

    #[test]
    fn set_origin_formats_coordinates() {
        assert_eq!(
            set_origin_sequence(100.0, 100.0, 50.5),
            vec!["G92 X100.000 Y100.000 Z50.500", "G90"]
        );
    }

    #[test]
    fn ack_predicate() {
        assert!(is_ack("ok"));
        assert!(is_ack("OK"));
        assert!(is_ack("  ok  "));
        assert!(is_ack("echo: ok"));
        assert!(!is_ack("okay"));
        assert!(!is_ack("error"));
    }

    #[test]
    fn position_report_first_occurrence_wins() {
        let lines = vec![
            "X:50.00 Y:49.50 Z:10.00 E:0.00 Count X:4000 Y:3960 Z:800".to_string(),
        ];
        let values = parse_position_report(&lines);
        assert_eq!(values.get("x"), Some(&50.0));
        assert_eq!(values.get("y"), Some(&49.5));
        assert_eq!(values.get("z"), Some(&10.0));
    }

    #[test]
    fn position_report_ignores_junk() {
        let lines = vec!["echo:busy processing".to_string(), "X:1.0 Y:abc".to_string()];
        let values = parse_position_report(&lines);
        assert_eq!(values.get("x"), Some(&1.0));
        assert!(!values.contains_key("y"));
    }
}
