use flatgeobuf::{FallibleStreamingIterator, FgbFeature, FgbReader};
use geozero::{ColumnValue, FeatureProperties, PropertyProcessor, ToGeo};
use serde_json::{Number, Value};
use std::io::Read;
use tracing::debug;

use super::{FeatureDecoder, FeatureIter};
use crate::error::DecodeError;
use crate::model::{Feature, Properties};

/// Sequential FlatGeobuf decoder. Reads features front to back without
/// seeking, so it works on a plain network stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGeobufDecoder;

impl FeatureDecoder for FlatGeobufDecoder {
    fn decode(&self, reader: Box<dyn Read + Send>) -> Result<FeatureIter, DecodeError> {
        let mut features = FgbReader::open(reader)?.select_all_seq()?;
        let mut failed = false;
        let mut decoded = 0usize;

        Ok(Box::new(std::iter::from_fn(move || {
            if failed {
                return None;
            }
            match features.next() {
                Ok(Some(feature)) => {
                    decoded += 1;
                    let converted = convert_feature(feature);
                    failed = converted.is_err();
                    Some(converted)
                }
                Ok(None) => {
                    debug!(decoded, "end of FlatGeobuf stream");
                    None
                }
                Err(e) => {
                    failed = true;
                    Some(Err(e.into()))
                }
            }
        })))
    }
}

fn convert_feature(feature: &FgbFeature) -> Result<Feature, DecodeError> {
    let geometry = feature.to_geo()?;
    let mut properties = PropertyCollector::default();
    feature.process_properties(&mut properties)?;
    Ok(Feature::new(geometry, properties.0))
}

/// Collects FlatGeobuf columns into a JSON property map.
#[derive(Default)]
struct PropertyCollector(Properties);

impl PropertyProcessor for PropertyCollector {
    fn property(
        &mut self,
        _idx: usize,
        name: &str,
        value: &ColumnValue,
    ) -> geozero::error::Result<bool> {
        let value = match value {
            ColumnValue::Bool(v) => Value::Bool(*v),
            ColumnValue::Byte(v) => Value::from(*v),
            ColumnValue::UByte(v) => Value::from(*v),
            ColumnValue::Short(v) => Value::from(*v),
            ColumnValue::UShort(v) => Value::from(*v),
            ColumnValue::Int(v) => Value::from(*v),
            ColumnValue::UInt(v) => Value::from(*v),
            ColumnValue::Long(v) => Value::from(*v),
            ColumnValue::ULong(v) => Value::from(*v),
            ColumnValue::Float(v) => float_value(f64::from(*v)),
            ColumnValue::Double(v) => float_value(*v),
            ColumnValue::String(v) | ColumnValue::DateTime(v) => Value::String((*v).to_string()),
            ColumnValue::Json(v) => {
                serde_json::from_str(v).unwrap_or_else(|_| Value::String((*v).to_string()))
            }
            // binary blobs have no scalar representation
            _ => return Ok(false),
        };
        self.0.insert(name.to_string(), value);
        Ok(false)
    }
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}
