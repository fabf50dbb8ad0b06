//! Validation run configuration

use crate::error::ValidatorError;
use crate::issue::{Severity, SeverityOverrides};
use crate::resource::ResourceLoader;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Default cap on reported issues
pub const DEFAULT_MAX_ISSUES: usize = 100;

/// Input encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// JSON document
    Gltf,
    /// Binary container
    Glb,
}

/// Options for one validation run
///
/// Deserializable from TOML or JSON with camelCase keys:
///
/// ```toml
/// maxIssues = 50
/// ignoredIssues = ["UNUSED_OBJECT"]
///
/// [severityOverrides]
/// NODE_EMPTY = "warning"
/// ```
#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Maximum number of issues in the report; 0 means unlimited
    pub max_issues: usize,
    /// Codes dropped from the report
    pub ignored_issues: Vec<String>,
    /// If non-empty, only these codes are reported
    pub only_issues: Vec<String>,
    /// Code to severity replacements
    pub severity_overrides: SeverityOverrides,
    /// Decode buffer contents and check accessor data
    pub validate_accessor_data: bool,
    /// Force the input format instead of detecting it
    pub format: Option<InputFormat>,
    /// Name of the input, used for format detection and the report
    pub uri: Option<String>,
    /// Fetches external buffers and images
    #[serde(skip)]
    pub loader: Option<Arc<dyn ResourceLoader>>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_issues: DEFAULT_MAX_ISSUES,
            ignored_issues: Vec::new(),
            only_issues: Vec::new(),
            severity_overrides: SeverityOverrides::new(),
            validate_accessor_data: true,
            format: None,
            uri: None,
            loader: None,
        }
    }
}

impl fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("max_issues", &self.max_issues)
            .field("ignored_issues", &self.ignored_issues)
            .field("only_issues", &self.only_issues)
            .field("severity_overrides", &self.severity_overrides)
            .field("validate_accessor_data", &self.validate_accessor_data)
            .field("format", &self.format)
            .field("uri", &self.uri)
            .field("loader", &self.loader.as_ref().map(|_| "<dyn ResourceLoader>"))
            .finish()
    }
}

impl ValidationOptions {
    /// Parse options from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ValidatorError> {
        Ok(toml::from_str(source)?)
    }

    /// Install the external resource capability
    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_severity(mut self, code: &str, severity: Severity) -> Self {
        self.severity_overrides.insert(code.to_string(), severity);
        self
    }

    /// Whether a code survives the allow-list and deny-list filters
    pub(crate) fn admits(&self, code: &str) -> bool {
        if !self.only_issues.is_empty() && !self.only_issues.iter().any(|c| c == code) {
            return false;
        }
        !self.ignored_issues.iter().any(|c| c == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ValidationOptions::default();
        assert_eq!(options.max_issues, 100);
        assert!(options.validate_accessor_data);
        assert!(options.admits("NODE_LOOP"));
    }

    #[test]
    fn test_from_toml() {
        let options = ValidationOptions::from_toml_str(
            r#"
            maxIssues = 5
            ignoredIssues = ["UNUSED_OBJECT"]
            validateAccessorData = false
            format = "glb"

            [severityOverrides]
            NODE_EMPTY = "warning"
            "#,
        )
        .unwrap();

        assert_eq!(options.max_issues, 5);
        assert_eq!(options.format, Some(InputFormat::Glb));
        assert!(!options.validate_accessor_data);
        assert_eq!(options.severity_overrides.get("NODE_EMPTY"), Some(&Severity::Warning));
        assert!(!options.admits("UNUSED_OBJECT"));
    }

    #[test]
    fn test_from_toml_rejects_bad_severity() {
        let err = ValidationOptions::from_toml_str("[severityOverrides]\nNODE_EMPTY = \"fatal\"\n");
        assert!(matches!(err, Err(ValidatorError::Config(_))));
    }

    #[test]
    fn test_only_issues_then_ignored() {
        let options = ValidationOptions {
            only_issues: vec!["NODE_LOOP".into(), "NODE_EMPTY".into()],
            ignored_issues: vec!["NODE_EMPTY".into()],
            ..Default::default()
        };
        assert!(options.admits("NODE_LOOP"));
        assert!(!options.admits("NODE_EMPTY"));
        assert!(!options.admits("UNUSED_OBJECT"));
    }
}
