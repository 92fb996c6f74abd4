//! Input records.

use serde::{Deserialize, Serialize};

/// One unlockable entity handed to the builder.
///
/// Field aliases accept the record shape produced by the game-side exporter
/// (`formId`, `school`, `skillLevel`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(alias = "formId")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "school")]
    pub bucket: String,
    #[serde(alias = "skillLevel")]
    pub tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_confidence: Option<f64>,
}

impl ItemRecord {
    pub fn new(id: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            bucket: String::new(),
            tier: tier.into(),
            theme: None,
            theme_confidence: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn with_theme_confidence(mut self, theme: impl Into<String>, confidence: f64) -> Self {
        self.theme = Some(theme.into());
        self.theme_confidence = Some(confidence);
        self
    }

    /// Name to display, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exporter_field_names() {
        let raw = r#"{"formId":"0x0012FD","name":"Flames","school":"Destruction","skillLevel":"Novice"}"#;
        let item: ItemRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(item.id, "0x0012FD");
        assert_eq!(item.bucket, "Destruction");
        assert_eq!(item.tier, "Novice");
        assert_eq!(item.theme, None);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(ItemRecord::new("x1", "Adept").display_name(), "x1");
        assert_eq!(ItemRecord::new("x1", "Adept").with_name("Ward").display_name(), "Ward");
    }
}
