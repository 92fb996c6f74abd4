//! Collaborator seams.
//!
//! Theme discovery and configuration advice happen outside this crate. The
//! builder only sees them through these traits and never needs either one
//! to produce a valid tree.

use std::collections::BTreeMap;

use crate::config::BucketOverride;
use crate::model::ItemRecord;

/// `item id -> (theme label, confidence)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeAssignment {
    labels: BTreeMap<String, (String, f64)>,
}

impl ThemeAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, label: impl Into<String>, confidence: f64) {
        self.labels.insert(id.into(), (label.into(), confidence));
    }

    pub fn get(&self, id: &str) -> Option<(&str, f64)> {
        self.labels.get(id).map(|(label, conf)| (label.as_str(), *conf))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for `id` if its confidence reaches `min_confidence`.
    pub fn confident_label(&self, id: &str, min_confidence: f64) -> Option<&str> {
        self.get(id)
            .filter(|(label, conf)| !label.trim().is_empty() && *conf >= min_confidence)
            .map(|(label, _)| label)
    }
}

impl FromIterator<(String, String, f64)> for ThemeAssignment {
    fn from_iter<I: IntoIterator<Item = (String, String, f64)>>(iter: I) -> Self {
        let mut assignment = Self::new();
        for (id, label, conf) in iter {
            assignment.insert(id, label, conf);
        }
        assignment
    }
}

/// Supplies theme labels for items.
pub trait ThemeSource {
    fn assign_themes(&self, items: &[ItemRecord]) -> ThemeAssignment;
}

/// Reads the labels already carried on the records. A missing confidence
/// counts as certain.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedThemes;

impl ThemeSource for RecordedThemes {
    fn assign_themes(&self, items: &[ItemRecord]) -> ThemeAssignment {
        items
            .iter()
            .filter_map(|item| {
                let label = item.theme.as_ref()?;
                Some((item.id.clone(), label.clone(), item.theme_confidence.unwrap_or(1.0)))
            })
            .collect()
    }
}

/// Optional per-bucket advice.
pub trait ConfigAdvisor {
    /// Settings for `bucket`, judged from a sample of its items. Only
    /// consulted for buckets without an explicit override.
    fn suggest_config(&self, bucket: &str, sample: &[ItemRecord]) -> Option<BucketOverride>;

    /// Labels for items the theme source left unassigned.
    fn resolve_ambiguous(&self, _items: &[ItemRecord]) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Fixed advice per bucket.
#[derive(Debug, Clone, Default)]
pub struct StaticAdvisor {
    pub suggestions: BTreeMap<String, BucketOverride>,
    pub labels: BTreeMap<String, String>,
}

impl ConfigAdvisor for StaticAdvisor {
    fn suggest_config(&self, bucket: &str, _sample: &[ItemRecord]) -> Option<BucketOverride> {
        self.suggestions.get(bucket).cloned()
    }

    fn resolve_ambiguous(&self, items: &[ItemRecord]) -> BTreeMap<String, String> {
        items
            .iter()
            .filter_map(|item| Some((item.id.clone(), self.labels.get(&item.id)?.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_themes_keep_confidence() {
        let items = vec![
            ItemRecord::new("a", "Novice").with_theme("fire"),
            ItemRecord::new("b", "Novice").with_theme_confidence("frost", 0.1),
            ItemRecord::new("c", "Novice"),
        ];
        let themes = RecordedThemes.assign_themes(&items);
        assert_eq!(themes.len(), 2);
        assert_eq!(themes.get("a"), Some(("fire", 1.0)));
        assert_eq!(themes.confident_label("b", 0.3), None);
        assert_eq!(themes.confident_label("b", 0.05), Some("frost"));
        assert_eq!(themes.get("c"), None);
    }

    #[test]
    fn test_static_advisor_resolves_known_ids() {
        let mut advisor = StaticAdvisor::default();
        advisor.labels.insert("x".into(), "shock".into());
        let items = vec![ItemRecord::new("x", "Adept"), ItemRecord::new("y", "Adept")];
        let resolved = advisor.resolve_ambiguous(&items);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["x"], "shock");
        assert!(advisor.suggest_config("Illusion", &items).is_none());
    }
}
