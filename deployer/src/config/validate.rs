//! Configuration validation
//!
//! Checks run when a step configuration is saved, before any build uses it.
//! These are the only checks performed outside the deployment pipeline.

use std::path::{Component, Path};

use serde::Serialize;
use url::Url;

use crate::config::settings::{ApiVariant, StepConfig};

/// Result of validating one form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum FormValidation {
    Ok,
    Error(String),
}

impl FormValidation {
    pub fn error(message: impl Into<String>) -> Self {
        FormValidation::Error(message.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FormValidation::Ok)
    }
}

/// Validation results keyed by field name
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub fields: Vec<(String, FormValidation)>,
}

impl ValidationReport {
    fn push(&mut self, field: impl Into<String>, result: FormValidation) {
        self.fields.push((field.into(), result));
    }

    /// True when no field failed
    pub fn is_ok(&self) -> bool {
        self.fields.iter().all(|(_, result)| result.is_ok())
    }

    /// Failed fields with their messages
    pub fn errors(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(field, result)| match result {
                FormValidation::Error(message) => Some((field.as_str(), message.as_str())),
                FormValidation::Ok => None,
            })
            .collect()
    }
}

/// Whether `value` parses as an absolute URL
pub fn is_url(value: &str) -> bool {
    parse_absolute_url(value).is_ok()
}

/// Parse `value` as an absolute URL with a host (`file:` URLs excepted).
///
/// `host:8080/path` parses with `host` as its scheme; it is rejected here.
pub fn parse_absolute_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| e.to_string())?;
    if !url.has_host() && url.scheme() != "file" {
        return Err(format!("no host in URL (scheme is '{}')", url.scheme()));
    }
    Ok(url)
}

/// Validate a URL field
pub fn verify_url(value: &str) -> FormValidation {
    if !is_url(value) {
        return FormValidation::error("Not a valid URL");
    }
    FormValidation::Ok
}

/// Validate an override URI.
///
/// Values with placeholders only resolve at build time, so they are
/// re-checked before submission instead.
pub fn verify_uri(value: &str) -> FormValidation {
    if value.contains('$') {
        return FormValidation::Ok;
    }
    verify_url(value)
}

/// Validate the descriptor filename override
pub fn verify_filename(value: &str) -> FormValidation {
    let path = Path::new(value.trim());
    if path.is_absolute() {
        return FormValidation::error("Filename must be relative to the workspace");
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return FormValidation::error("Filename must not leave the workspace");
    }
    FormValidation::Ok
}

/// Validate a complete step configuration
pub fn validate_config(config: &StepConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    report.push("url", verify_url(&config.url));

    if let Some(filename) = config.filename.as_deref() {
        report.push("filename", verify_filename(filename));
    }

    for (i, uri) in config.uris.iter().enumerate() {
        report.push(format!("uris[{}]", i), verify_uri(&uri.uri));
    }

    for (i, label) in config.labels.iter().enumerate() {
        if label.name.trim().is_empty() {
            report.push(format!("labels[{}]", i), FormValidation::error("Label name is required"));
        }
    }

    if let ApiVariant::Dcos { token_var } = &config.api {
        if token_var.trim().is_empty() {
            report.push("api.token_var", FormValidation::error("Token variable is required"));
        }
    }

    if config.timeout_secs == 0 {
        report.push("timeout_secs", FormValidation::error("Timeout must be positive"));
    }

    report
}
