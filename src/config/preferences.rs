//! User preferences persisted through the local cache.
//!
//! Preferences are the mutable part of the configuration: the test UI
//! changes them, and they are saved under `<configName>/<fieldName>` keys so
//! that they survive a page reload.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ============================================================================
// ViewLayout
// ============================================================================

/// How the test viewer lays out results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewLayout {
    /// Hierarchical tree of test suites.
    #[default]
    Tree,
    /// Flat list of test cases.
    List,
}

// ============================================================================
// Preferences
// ============================================================================

/// Display and run preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    /// Result layout.
    pub view_layout: ViewLayout,
    /// Test name filter.
    pub filter: String,
    /// Interactive (human at the keyboard) or batch/CI mode.
    pub interactive: bool,
    /// Stop the run at the first failing step.
    pub stop_on_first_failure: bool,
    /// Output file for batch results.
    pub out_file: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            view_layout: ViewLayout::Tree,
            filter: String::new(),
            interactive: true,
            stop_on_first_failure: false,
            out_file: None,
        }
    }
}

// ============================================================================
// PersistedField
// ============================================================================

/// Preferences that are saved to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistedField {
    /// [`Preferences::view_layout`].
    ViewLayout,
    /// [`Preferences::filter`].
    Filter,
    /// [`Preferences::interactive`].
    Interactive,
    /// [`Preferences::stop_on_first_failure`].
    StopOnFirstFailure,
}

impl PersistedField {
    /// Every persisted field, in load order.
    pub const ALL: [Self; 4] = [
        Self::ViewLayout,
        Self::Filter,
        Self::Interactive,
        Self::StopOnFirstFailure,
    ];

    /// Field name used in the storage key.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ViewLayout => "ViewLayout",
            Self::Filter => "Filter",
            Self::Interactive => "Interactive",
            Self::StopOnFirstFailure => "StopOnFirstFailure",
        }
    }

    /// Storage key for this field under a configuration name.
    #[inline]
    #[must_use]
    pub fn key(&self, config_name: &str) -> String {
        config_key(config_name, self.name())
    }
}

impl fmt::Display for PersistedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PersistedField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| Error::unhandled_variable(s))
    }
}

/// Joins a configuration name and a part into a slash-delimited key.
#[must_use]
pub fn config_key(config_name: &str, part: &str) -> String {
    let name = config_name.trim_end_matches('/');
    let part = part.trim_start_matches('/');
    format!("{name}/{part}")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preferences() {
        let prefs = Preferences::default();
        assert_eq!(prefs.view_layout, ViewLayout::Tree);
        assert!(prefs.filter.is_empty());
        assert!(prefs.interactive);
        assert!(!prefs.stop_on_first_failure);
        assert!(prefs.out_file.is_none());
    }

    #[test]
    fn test_field_keys() {
        assert_eq!(PersistedField::ViewLayout.key("icu"), "icu/ViewLayout");
        assert_eq!(PersistedField::Filter.key("icu"), "icu/Filter");
        assert_eq!(PersistedField::Interactive.key("suite/"), "suite/Interactive");
        assert_eq!(
            PersistedField::StopOnFirstFailure.key("icu"),
            "icu/StopOnFirstFailure"
        );
    }

    #[test]
    fn test_parse_known_fields() {
        for field in PersistedField::ALL {
            let parsed: PersistedField = field.name().parse().expect("known field");
            assert_eq!(parsed, field);
        }
    }

    #[test]
    fn test_parse_unknown_field() {
        let err = "Colour".parse::<PersistedField>().unwrap_err();
        assert!(matches!(err, Error::UnhandledVariable { ref name } if name == "Colour"));
    }

    #[test]
    fn test_view_layout_json() {
        assert_eq!(serde_json::to_string(&ViewLayout::List).expect("json"), "\"List\"");
    }
}
