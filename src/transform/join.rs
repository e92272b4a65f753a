use geo_types::Geometry;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::config::JoinConfig;
use crate::model::{Feature, JoinedRecord, TabularRecord};

/// Canonical form used to compare region names from the two datasets.
pub trait NameNormalizer: Send + Sync {
    fn normalize(&self, name: &str) -> String;
}

/// Unicode uppercase, the convention of the boundary files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uppercase;

impl NameNormalizer for Uppercase {
    fn normalize(&self, name: &str) -> String {
        name.to_uppercase()
    }
}

impl<F> NameNormalizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn normalize(&self, name: &str) -> String {
        self(name)
    }
}

/// Result of a join. Unmatched rows are not errors, only counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    pub records: Vec<JoinedRecord>,
    pub dropped: usize,
}

/// Attaches point coordinates to tabular rows by region name.
///
/// Every row is matched against the first feature, in feature order, whose
/// normalized name equals the row's normalized name. Later features with the
/// same name are never consulted, even when the first one is not a point.
#[derive(Debug, Clone)]
pub struct CoordinateJoin<N = Uppercase> {
    config: JoinConfig,
    normalizer: N,
}

impl CoordinateJoin<Uppercase> {
    pub fn new(config: JoinConfig) -> Self {
        Self {
            config,
            normalizer: Uppercase,
        }
    }
}

impl<N: NameNormalizer> CoordinateJoin<N> {
    pub fn with_normalizer<M: NameNormalizer>(self, normalizer: M) -> CoordinateJoin<M> {
        CoordinateJoin {
            config: self.config,
            normalizer,
        }
    }

    pub fn join<I>(&self, rows: I, features: &[Feature]) -> JoinOutcome
    where
        I: IntoIterator<Item = TabularRecord>,
    {
        let mut by_name: HashMap<String, &Feature> = HashMap::with_capacity(features.len());
        for feature in features {
            let Some(name) = feature
                .properties
                .get(&self.config.feature_name_field)
                .and_then(key_text)
            else {
                continue;
            };
            by_name
                .entry(self.normalizer.normalize(&name))
                .or_insert(feature);
        }

        let mut outcome = JoinOutcome::default();
        for row in rows {
            let matched = row
                .get(&self.config.row_name_field)
                .and_then(key_text)
                .and_then(|name| by_name.get(&self.normalizer.normalize(&name)));

            match matched.map(|feature| &feature.geometry) {
                Some(Geometry::Point(point)) => outcome.records.push(JoinedRecord {
                    lat: point.y(),
                    lon: point.x(),
                    row,
                }),
                _ => outcome.dropped += 1,
            }
        }

        debug!(
            joined = outcome.records.len(),
            dropped = outcome.dropped,
            features = features.len(),
            "coordinate join"
        );
        outcome
    }
}

/// Joins `rows` onto point `features` with the default uppercase matching,
/// dropping rows without a point match.
pub fn join_coordinates(
    rows: Vec<TabularRecord>,
    features: &[Feature],
    config: &JoinConfig,
) -> Vec<JoinedRecord> {
    CoordinateJoin::new(config.clone()).join(rows, features).records
}

fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
