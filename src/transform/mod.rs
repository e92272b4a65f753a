//! Pure transforms applied after loading: coordinate join and visual encoding.

pub mod encode;
pub mod join;
pub mod popup;

pub use encode::{encode_visual_attributes, EncodedFeature, MarkerAngle};
pub use join::{join_coordinates, CoordinateJoin, JoinOutcome, NameNormalizer, Uppercase};
pub use popup::{build_popup_message, PopupLabels};
