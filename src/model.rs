use geo_types::Geometry;
use serde::Serialize;
use serde_json::{Map, Value};

/// Column name -> scalar value. Used for both feature properties and tabular rows.
pub type Properties = Map<String, Value>;

/// One row of the external tabular dataset (e.g. a sub-district vote tally).
pub type TabularRecord = Properties;

/// A decoded geographic feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: Properties,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>, properties: Properties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    /// String value of a property, if present and textual.
    pub fn name(&self, field: &str) -> Option<&str> {
        self.properties.get(field).and_then(Value::as_str)
    }
}

/// A tabular row that was matched to a point feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    #[serde(flatten)]
    pub row: TabularRecord,
    pub lat: f64,
    pub lon: f64,
}

/// Anything the visual encoding can read attributes from.
pub trait AttributeRecord {
    fn attributes(&self) -> &Properties;

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes().get(name)
    }
}

impl AttributeRecord for Feature {
    fn attributes(&self) -> &Properties {
        &self.properties
    }
}

impl AttributeRecord for JoinedRecord {
    fn attributes(&self) -> &Properties {
        &self.row
    }
}

impl AttributeRecord for Properties {
    fn attributes(&self) -> &Properties {
        self
    }
}

impl<T: AttributeRecord + ?Sized> AttributeRecord for &T {
    fn attributes(&self) -> &Properties {
        (**self).attributes()
    }
}
