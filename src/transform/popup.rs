use crate::config::EncodingConfig;

/// Names shown for the side a change favours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupLabels {
    pub positive: String,
    pub negative: String,
}

impl Default for PopupLabels {
    fn default() -> Self {
        Self::from(&EncodingConfig::default())
    }
}

impl From<&EncodingConfig> for PopupLabels {
    fn from(config: &EncodingConfig) -> Self {
        Self {
            positive: config.positive_label.clone(),
            negative: config.negative_label.clone(),
        }
    }
}

impl PopupLabels {
    /// The label carries the direction; the number is always printed as a
    /// non-negative value with a leading `+`. Zero counts as negative.
    pub fn render(&self, area: &str, change: f64) -> String {
        let label = if change > 0.0 {
            &self.positive
        } else {
            &self.negative
        };
        format!(
            "<strong>{}</strong><br/>{} Change: +{:.2}%",
            area,
            label,
            change.abs()
        )
    }
}

/// Popup text with the default candidate labels.
pub fn build_popup_message(area: &str, change: f64) -> String {
    PopupLabels::default().render(area, change)
}
