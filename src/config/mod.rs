// Configuration management for the IPDraft PDF engine
// Per-document-type formatting overrides, merged shallowly over built-ins

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::domain::{DocumentType, FormattingRules, LineSpacing, Margins, PageNumberPosition};

/// Partial formatting rules supplied by a host. Any present field replaces
/// the built-in value for that document type; absent fields are preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormattingOverrides {
    pub line_spacing: Option<LineSpacing>,
    pub font_size: Option<f32>,
    pub font_face: Option<String>,
    pub margins: Option<Margins>,
    pub page_number_position: Option<PageNumberPosition>,
    pub title_case: Option<bool>,
    pub section_numbering: Option<bool>,
    pub paragraph_indent: Option<f32>,
    pub paragraph_spacing: Option<f32>,
    pub block_quote_indent: Option<f32>,
    pub signature_line_spacing: Option<LineSpacing>,
}

impl FormattingOverrides {
    /// Shallow merge: each present field overwrites the corresponding
    /// rules field.
    pub fn apply(&self, rules: &mut FormattingRules) {
        if let Some(value) = self.line_spacing {
            rules.line_spacing = value;
        }
        if let Some(value) = self.font_size {
            rules.font_size = value;
        }
        if let Some(value) = &self.font_face {
            rules.font_face = value.clone();
        }
        if let Some(value) = self.margins {
            rules.margins = value;
        }
        if let Some(value) = self.page_number_position {
            rules.page_number_position = value;
        }
        if let Some(value) = self.title_case {
            rules.title_case = value;
        }
        if let Some(value) = self.section_numbering {
            rules.section_numbering = value;
        }
        if let Some(value) = self.paragraph_indent {
            rules.paragraph_indent = value;
        }
        if let Some(value) = self.paragraph_spacing {
            rules.paragraph_spacing = value;
        }
        if let Some(value) = self.block_quote_indent {
            rules.block_quote_indent = value;
        }
        if let Some(value) = self.signature_line_spacing {
            rules.signature_line_spacing = value;
        }
    }
}

/// Formatting configuration: a mapping from document type to partial
/// rule overrides. Immutable for the lifetime of a rules service; hosts
/// that reconfigure do so between exports by building a new service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormattingConfig {
    pub overrides: HashMap<DocumentType, FormattingOverrides>,
}

impl FormattingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, doc_type: DocumentType, overrides: FormattingOverrides) -> Self {
        self.overrides.insert(doc_type, overrides);
        self
    }

    pub fn overrides_for(&self, doc_type: DocumentType) -> Option<&FormattingOverrides> {
        self.overrides.get(&doc_type)
    }

    /// Load overrides from a YAML file. A missing file is not an error;
    /// it yields the empty configuration.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Formatting config file not found, using defaults: {:?}", path);
            return Ok(Self::default());
        }

        info!("Loading formatting configuration from: {:?}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read formatting config file: {:?}", path))?;
        let config = Self::from_yaml_str(&content)?;
        debug!("Loaded formatting overrides for {} document types", config.overrides.len());
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).with_context(|| "Failed to parse formatting configuration YAML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shallow_merge_preserves_unset_fields() {
        let mut rules = FormattingRules::default();
        let overrides = FormattingOverrides {
            font_size: Some(11.0),
            title_case: Some(true),
            ..Default::default()
        };
        overrides.apply(&mut rules);

        assert_eq!(rules.font_size, 11.0);
        assert!(rules.title_case);
        // Untouched fields keep their defaults.
        assert_eq!(rules.line_spacing, LineSpacing::Double);
        assert_eq!(rules.margins, Margins::uniform(72.0));
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
overrides:
  nda-ip-specific:
    font_size: 11.0
    line_spacing: one-half
  cease-and-desist-letter:
    margins:
      top: 90.0
      bottom: 72.0
      left: 72.0
      right: 72.0
"#;
        let config = FormattingConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.overrides.len(), 2);

        let nda = config.overrides_for(DocumentType::NdaIpSpecific).unwrap();
        assert_eq!(nda.font_size, Some(11.0));
        assert_eq!(nda.line_spacing, Some(LineSpacing::OneHalf));
        assert_eq!(nda.margins, None);

        let letter = config.overrides_for(DocumentType::CeaseAndDesistLetter).unwrap();
        assert_eq!(letter.margins.unwrap().top, 90.0);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = FormattingConfig::from_yaml_file(Path::new("/nonexistent/formatting.yaml")).unwrap();
        assert!(config.overrides.is_empty());
    }
}
