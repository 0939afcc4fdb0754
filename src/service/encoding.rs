//! Value <-> `[0,1]` encoding and decoding (§4.4.1, §4.4.2).
//!
//! These are pure functions of a parameter's schema plus whatever history
//! the unbounded-continuous rescaling envelope needs; the service supplies
//! that history by scanning a `BoState`'s observations rather than this
//! module caching anything, so the envelope is always recomputed fresh.

use crate::domain::{Observation, ParamSchema, ParamValue};
use crate::error::{BoError, Result};

/// Historical raw numeric values of `param_id` across `observations`, in
/// insertion order. Used as the basis for the unbounded-continuous envelope.
pub fn numeric_history(observations: &[Observation], param_id: &str) -> Vec<f64> {
    observations
        .iter()
        .filter_map(|o| o.raw_values.get(param_id).and_then(ParamValue::as_number))
        .collect()
}

/// The `[lo, hi]` rescaling envelope for an unbounded-continuous parameter.
///
/// `new_value` is `Some(v)` when encoding (the envelope unions history with
/// the value being encoded) and `None` when decoding (only history counts).
/// Degenerate history (all equal, or empty with no new value) falls back to
/// a unit-wide envelope centered on the single known value.
fn unbounded_envelope(history: &[f64], new_value: Option<f64>, padding: f64) -> (f64, f64) {
    let mut all: Vec<f64> = history.to_vec();
    if let Some(v) = new_value {
        all.push(v);
    }
    let lo = all.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = all.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if hi > lo {
        let pad = (hi - lo) * padding;
        (lo - pad, hi + pad)
    } else {
        match new_value {
            Some(v) => (v - 1.0, v + 1.0),
            None => (lo - 1.0, hi + 1.0),
        }
    }
}

/// Encode a raw value into `[0,1]` per §4.4.1. `history` is the pair's
/// historical raw values for this parameter id (only consulted for
/// unbounded-continuous).
pub fn encode_value(schema: &ParamSchema, value: &ParamValue, history: &[f64], padding: f64) -> Result<f64> {
    match schema {
        ParamSchema::BoundedContinuous { min, max, .. } => {
            let v = expect_number(schema, value)?;
            Ok((v - min) / (max - min))
        }
        ParamSchema::UnboundedContinuous { .. } => {
            let v = expect_number(schema, value)?;
            let (lo, hi) = unbounded_envelope(history, Some(v), padding);
            Ok((v - lo) / (hi - lo))
        }
        ParamSchema::Ordinal { options, .. } => {
            let opt = expect_option(schema, value)?;
            if options.len() <= 1 {
                return Ok(0.0);
            }
            match options.iter().position(|o| o == opt) {
                Some(i) => Ok(i as f64 / (options.len() - 1) as f64),
                None => Ok(0.0),
            }
        }
        ParamSchema::FreeText { .. } => Err(BoError::invalid_input(format!(
            "free-text parameter {} does not enter the model",
            schema.id()
        ))),
    }
}

/// Decode a normalized `[0,1]` value back to raw units per §4.4.2.
pub fn decode_value(schema: &ParamSchema, u: f64, history: &[f64], padding: f64) -> ParamValue {
    match schema {
        ParamSchema::BoundedContinuous { min, max, step, .. } => {
            let raw = min + u * (max - min);
            let snapped = (raw / step).round() * step;
            ParamValue::Number(snapped.clamp(*min, *max))
        }
        ParamSchema::UnboundedContinuous { default, .. } => {
            if history.is_empty() {
                return ParamValue::Number(default.unwrap_or(0.0));
            }
            let (lo, hi) = unbounded_envelope(history, None, padding);
            let raw = lo + u * (hi - lo);
            ParamValue::Number((raw * 100.0).round() / 100.0)
        }
        ParamSchema::Ordinal { options, .. } => {
            if options.is_empty() {
                return ParamValue::Option(String::new());
            }
            let last = (options.len() - 1) as f64;
            let idx = (u * last).round().clamp(0.0, last) as usize;
            ParamValue::Option(options[idx].clone())
        }
        ParamSchema::FreeText { .. } => ParamValue::Text(String::new()),
    }
}

/// Encode an ingress rating `1..=10` to normalized `(r-1)/9 in [0,1]`.
pub fn encode_rating(rating: u8) -> f64 {
    (f64::from(rating) - 1.0) / 9.0
}

/// Decode a normalized mean rating back to `[1,10]`.
pub fn decode_rating_mean(normalized: f64) -> f64 {
    9.0 * normalized + 1.0
}

/// Decode a normalized standard deviation to rating units.
pub fn decode_rating_std(normalized_std: f64) -> f64 {
    9.0 * normalized_std
}

fn expect_number<'a>(schema: &ParamSchema, value: &'a ParamValue) -> Result<f64> {
    value
        .as_number()
        .ok_or_else(|| BoError::invalid_input(format!("expected a numeric value for parameter {}", schema.id())))
}

fn expect_option<'a>(schema: &ParamSchema, value: &'a ParamValue) -> Result<&'a str> {
    value
        .as_option_str()
        .ok_or_else(|| BoError::invalid_input(format!("expected an option value for parameter {}", schema.id())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded() -> ParamSchema {
        ParamSchema::BoundedContinuous {
            id: "grind".to_string(),
            name: "Grind".to_string(),
            min: 0.0,
            max: 10.0,
            step: 1.0,
            default: None,
        }
    }

    fn ordinal() -> ParamSchema {
        ParamSchema::Ordinal {
            id: "coarseness".to_string(),
            name: "Coarseness".to_string(),
            options: vec!["Fine".to_string(), "Medium".to_string(), "Coarse".to_string()],
            default: None,
        }
    }

    fn single_option_ordinal() -> ParamSchema {
        ParamSchema::Ordinal {
            id: "size".to_string(),
            name: "Size".to_string(),
            options: vec!["Only".to_string()],
            default: None,
        }
    }

    fn unbounded() -> ParamSchema {
        ParamSchema::UnboundedContinuous {
            id: "temp".to_string(),
            name: "Temperature".to_string(),
            default: None,
        }
    }

    #[test]
    fn bounded_round_trips_up_to_step() {
        let schema = bounded();
        for v in [0.0, 2.0, 5.0, 8.0, 10.0] {
            let u = encode_value(&schema, &ParamValue::Number(v), &[], 0.2).unwrap();
            let back = decode_value(&schema, u, &[], 0.2);
            assert_eq!(back, ParamValue::Number(v));
        }
    }

    #[test]
    fn bounded_decode_clamps_to_range() {
        let schema = bounded();
        assert_eq!(decode_value(&schema, -1.0, &[], 0.2), ParamValue::Number(0.0));
        assert_eq!(decode_value(&schema, 2.0, &[], 0.2), ParamValue::Number(10.0));
    }

    #[test]
    fn ordinal_round_trips_exactly() {
        let schema = ordinal();
        for opt in ["Fine", "Medium", "Coarse"] {
            let u = encode_value(&schema, &ParamValue::Option(opt.to_string()), &[], 0.2).unwrap();
            let back = decode_value(&schema, u, &[], 0.2);
            assert_eq!(back, ParamValue::Option(opt.to_string()));
        }
    }

    #[test]
    fn ordinal_unknown_option_encodes_to_zero() {
        let schema = ordinal();
        let u = encode_value(&schema, &ParamValue::Option("Unknown".to_string()), &[], 0.2).unwrap();
        assert_eq!(u, 0.0);
    }

    #[test]
    fn single_option_ordinal_encodes_and_decodes_to_sole_option() {
        let schema = single_option_ordinal();
        let u = encode_value(&schema, &ParamValue::Option("Only".to_string()), &[], 0.2).unwrap();
        assert_eq!(u, 0.0);
        assert_eq!(decode_value(&schema, 0.7, &[], 0.2), ParamValue::Option("Only".to_string()));
    }

    #[test]
    fn unbounded_round_trips_to_two_decimal_places() {
        let schema = unbounded();
        let history = vec![90.0, 92.0, 94.0, 96.0];
        let u = encode_value(&schema, &ParamValue::Number(92.0), &history, 0.2).unwrap();
        let back = decode_value(&schema, u, &history, 0.2);
        match back {
            ParamValue::Number(v) => assert!((v - 92.0).abs() < 0.01),
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn unbounded_decode_with_no_history_uses_default() {
        let schema = ParamSchema::UnboundedContinuous {
            id: "temp".to_string(),
            name: "Temperature".to_string(),
            default: Some(93.0),
        };
        assert_eq!(decode_value(&schema, 0.5, &[], 0.2), ParamValue::Number(93.0));
    }

    #[test]
    fn unbounded_decode_with_no_history_and_no_default_is_zero() {
        let schema = unbounded();
        assert_eq!(decode_value(&schema, 0.5, &[], 0.2), ParamValue::Number(0.0));
    }

    #[test]
    fn unbounded_single_distinct_value_uses_unit_envelope() {
        let schema = unbounded();
        let (lo, hi) = unbounded_envelope(&[90.0, 90.0], None, 0.2);
        assert_eq!(lo, 89.0);
        assert_eq!(hi, 91.0);
    }

    #[test]
    fn encoding_free_text_is_invalid_input() {
        let schema = ParamSchema::FreeText {
            id: "notes".to_string(),
            name: "Notes".to_string(),
            default: None,
        };
        let err = encode_value(&schema, &ParamValue::Text("hi".to_string()), &[], 0.2).unwrap_err();
        assert!(matches!(err, BoError::InvalidInput(_)));
    }

    #[test]
    fn rating_round_trips() {
        for r in 1u8..=10 {
            let norm = encode_rating(r);
            assert!((0.0..=1.0).contains(&norm));
            assert!((decode_rating_mean(norm) - f64::from(r)).abs() < 1e-9);
        }
    }
}
