//! Streaming loader for FlatGeobuf feature collections with byte-level
//! progress reporting, plus the transforms that turn tabular rows and
//! features into map markers.

pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod model;
pub mod progress;
pub mod rows;
pub mod transform;

pub use config::AppConfig;
pub use error::{DecodeError, LoadError};
pub use loader::{FeatureLoader, DEFAULT_RESOURCE};
pub use model::{AttributeRecord, Feature, JoinedRecord, Properties, TabularRecord};
pub use progress::{LoggedProgress, ProgressIndicator, SharedProgress};
