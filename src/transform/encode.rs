use serde::Serialize;
use serde_json::Value;

use super::popup::PopupLabels;
use crate::config::EncodingConfig;
use crate::model::{AttributeRecord, Properties};

/// Marker rotation. Serialized as degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
pub enum MarkerAngle {
    Flat,
    Rising,
    Falling,
}

impl MarkerAngle {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            MarkerAngle::Rising
        } else if change < 0.0 {
            MarkerAngle::Falling
        } else {
            MarkerAngle::Flat
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            MarkerAngle::Flat => 0,
            MarkerAngle::Rising => 135,
            MarkerAngle::Falling => 225,
        }
    }
}

impl From<MarkerAngle> for u16 {
    fn from(angle: MarkerAngle) -> Self {
        angle.degrees()
    }
}

/// A record plus the marker attributes derived from its change value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedFeature<T> {
    #[serde(flatten)]
    pub record: T,
    pub size: f64,
    pub angle: MarkerAngle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: AttributeRecord> AttributeRecord for EncodedFeature<T> {
    fn attributes(&self) -> &Properties {
        self.record.attributes()
    }
}

/// Position of `|change|` between 0 and `max_abs_change` on a log1p scale.
/// Zero when the batch maximum is zero.
pub fn normalized_magnitude(change: f64, max_abs_change: f64) -> f64 {
    if max_abs_change.is_nan() || max_abs_change <= 0.0 {
        return 0.0;
    }
    (change.abs().ln_1p() / max_abs_change.ln_1p()).clamp(0.0, 1.0)
}

pub fn marker_size(t: f64, min_size: f64, max_size: f64) -> f64 {
    min_size + t * (max_size - min_size)
}

/// Numeric change of a record. Missing, null, non-numeric or non-finite
/// values count as zero; numeric strings are parsed.
pub fn change_value<R: AttributeRecord + ?Sized>(record: &R, field: &str) -> f64 {
    let value = match record.attribute(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Largest `|change|` across the batch, zero when empty.
pub fn max_abs_change<R: AttributeRecord>(records: &[R], field: &str) -> f64 {
    records
        .iter()
        .map(|r| change_value(r, field).abs())
        .fold(0.0, f64::max)
}

/// Derives size, angle and (when `area_field` is configured) popup text for
/// every record, normalizing against the batch's largest absolute change.
pub fn encode_visual_attributes<T: AttributeRecord>(
    records: Vec<T>,
    config: &EncodingConfig,
) -> Vec<EncodedFeature<T>> {
    let max_abs = max_abs_change(&records, &config.change_field);
    let labels = PopupLabels::from(config);

    records
        .into_iter()
        .map(|record| {
            let change = change_value(&record, &config.change_field);
            let t = normalized_magnitude(change, max_abs);
            let message = config
                .area_field
                .as_deref()
                .and_then(|field| record.attribute(field))
                .and_then(Value::as_str)
                .map(|area| labels.render(area, change));

            EncodedFeature {
                size: marker_size(t, config.min_size, config.max_size),
                angle: MarkerAngle::from_change(change),
                message,
                record,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_SIZE, MIN_SIZE};
    use crate::model::JoinedRecord;
    use serde_json::json;

    const CHANGE: &str = "comparison_kota_jokowi_percentage_change";

    fn record(change: Value) -> Properties {
        let mut props = Properties::new();
        props.insert("Nama Kelurahan_2014".into(), json!("Menteng"));
        props.insert(CHANGE.into(), change);
        props
    }

    fn batch(changes: &[f64]) -> Vec<Properties> {
        changes.iter().map(|c| record(json!(c))).collect()
    }

    #[test]
    fn test_angle_follows_sign() {
        assert_eq!(MarkerAngle::from_change(0.0).degrees(), 0);
        assert_eq!(MarkerAngle::from_change(5.0).degrees(), 135);
        assert_eq!(MarkerAngle::from_change(-5.0).degrees(), 225);
        assert_eq!(MarkerAngle::from_change(-0.0).degrees(), 0);
    }

    #[test]
    fn test_sizes_stay_in_range_and_grow_with_magnitude() {
        let changes = [0.0, -0.5, 1.0, 3.0, -7.25, 12.5, -40.0, 39.9];
        let encoded = encode_visual_attributes(batch(&changes), &EncodingConfig::default());

        for e in &encoded {
            assert!((MIN_SIZE..=MAX_SIZE).contains(&e.size), "size {}", e.size);
        }

        let mut by_magnitude: Vec<(f64, f64)> = changes
            .iter()
            .zip(&encoded)
            .map(|(c, e)| (c.abs(), e.size))
            .collect();
        by_magnitude.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(by_magnitude.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(by_magnitude.last().unwrap().1, MAX_SIZE);
        assert_eq!(by_magnitude[0].1, MIN_SIZE);
    }

    #[test]
    fn test_singleton_is_its_own_maximum() {
        let encoded = encode_visual_attributes(batch(&[-3.7]), &EncodingConfig::default());
        assert_eq!(encoded[0].size, MAX_SIZE);
        assert_eq!(encoded[0].angle, MarkerAngle::Falling);

        let flat = encode_visual_attributes(batch(&[0.0]), &EncodingConfig::default());
        assert_eq!(flat[0].size, MIN_SIZE);
        assert_eq!(flat[0].angle, MarkerAngle::Flat);
    }

    #[test]
    fn test_log_scaled_size() {
        let encoded = encode_visual_attributes(batch(&[-12.5, 40.0]), &EncodingConfig::default());

        let t = 13.5f64.ln() / 41f64.ln();
        assert!((normalized_magnitude(-12.5, 40.0) - t).abs() < 1e-12);
        assert!((encoded[0].size - (6.0 + 18.0 * t)).abs() < 1e-9);
        assert!((encoded[0].size - 18.6).abs() < 0.05);
        assert_eq!(encoded[0].angle.degrees(), 225);
        assert_eq!(encoded[1].size, MAX_SIZE);
    }

    #[test]
    fn test_missing_or_bad_change_counts_as_zero() {
        let mut missing = Properties::new();
        missing.insert("Nama Kelurahan_2014".into(), json!("Gambir"));
        let records = vec![
            missing,
            record(Value::Null),
            record(json!("not a number")),
            record(json!(" -8.5 ")),
        ];

        let encoded = encode_visual_attributes(records, &EncodingConfig::default());
        for e in &encoded[..3] {
            assert_eq!(e.size, MIN_SIZE);
            assert_eq!(e.angle, MarkerAngle::Flat);
        }
        assert_eq!(encoded[3].size, MAX_SIZE);
        assert_eq!(encoded[3].angle, MarkerAngle::Falling);
    }

    #[test]
    fn test_empty_batch() {
        let encoded =
            encode_visual_attributes(Vec::<Properties>::new(), &EncodingConfig::default());
        assert!(encoded.is_empty());
        assert_eq!(max_abs_change::<Properties>(&[], CHANGE), 0.0);
        assert_eq!(normalized_magnitude(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_reencoding_is_idempotent() {
        let config = EncodingConfig::default();
        let first = encode_visual_attributes(batch(&[1.0, -2.0, 30.0]), &config);
        let again = encode_visual_attributes(first.clone(), &config);

        for (a, b) in first.iter().zip(&again) {
            assert_eq!(a.size, b.size);
            assert_eq!(a.angle, b.angle);
        }
    }

    #[test]
    fn test_popup_only_with_area_field() {
        let without = encode_visual_attributes(batch(&[-3.2]), &EncodingConfig::default());
        assert!(without[0].message.is_none());

        let config = EncodingConfig {
            area_field: Some("Nama Kelurahan_2014".to_string()),
            ..EncodingConfig::default()
        };
        let with = encode_visual_attributes(batch(&[-3.2]), &config);
        assert_eq!(
            with[0].message.as_deref(),
            Some("<strong>Menteng</strong><br/>Prabowo Change: +3.20%")
        );
    }

    #[test]
    fn test_encodes_joined_records_and_serializes_flat() {
        let joined = JoinedRecord {
            row: record(json!(2.0)),
            lat: -6.19,
            lon: 106.83,
        };
        let encoded = encode_visual_attributes(vec![joined], &EncodingConfig::default());

        let value = serde_json::to_value(&encoded[0]).unwrap();
        assert_eq!(value["lat"], -6.19);
        assert_eq!(value["angle"], 135);
        assert_eq!(value["size"], 24.0);
        assert_eq!(value[CHANGE], 2.0);
        assert!(value.get("message").is_none());
    }
}
