//! Unified diagnostic taxonomy and the aggregate validation error.

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// A single validation defect. The `#[error]` text is the message shown in reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    #[error("{what} contains unknown field \"{field}\". Refer to the definition to verify valid values.")]
    UnknownField { what: String, field: String },

    #[error("{what} is missing required field \"{required}\".")]
    MissingRequiredField { what: String, required: String },

    #[error("Type \"{what}\" is not a valid type.")]
    InvalidType { what: String },

    #[error("{message}")]
    InvalidValue { message: String },

    #[error("{message}")]
    InvalidSchema { message: String },

    #[error("Node type \"{what}\" is not a valid type.")]
    InvalidNodeType { what: String },

    #[error("\"{path}\" is not a valid file.")]
    InvalidPath { path: String },

    #[error("{what} is missing required input definition of input \"{input_name}\".")]
    MissingRequiredInput { what: String, input_name: String },

    #[error("{what} is missing required default value of input \"{input_name}\".")]
    MissingDefaultValue { what: String, input_name: String },

    #[error("{what} is missing required output definition of output \"{output_name}\".")]
    MissingRequiredOutput { what: String, output_name: String },

    #[error("Unknown output \"{output_name}\" in {location}.")]
    UnknownOutput { location: String, output_name: String },

    #[error("{what} is missing required parameter for input \"{input_name}\".")]
    MissingRequiredParameter { what: String, input_name: String },

    #[error("The template version \"{what}\" is invalid. Valid versions are \"{valid_versions}\".")]
    InvalidTemplateVersion { what: String, valid_versions: String },

    #[error("{what}")]
    UrlFailure { what: String },

    #[error("Failed to read \"{path}\": {reason}")]
    IoFailure { path: String, reason: String },

    #[error("Failed to parse \"{path}\": {reason}")]
    ParseFailure { path: String, reason: String },

    #[error("{message}")]
    ImportFailure { message: String },

    #[error("No path or pre-parsed document was provided. There is nothing to parse.")]
    NothingToParse,
}

/// Fieldless mirror of [`Issue`], used to filter collected diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    UnknownField,
    MissingRequiredField,
    InvalidType,
    InvalidValue,
    InvalidSchema,
    InvalidNodeType,
    InvalidPath,
    MissingRequiredInput,
    MissingDefaultValue,
    MissingRequiredOutput,
    UnknownOutput,
    MissingRequiredParameter,
    InvalidTemplateVersion,
    UrlFailure,
    IoFailure,
    ParseFailure,
    ImportFailure,
    NothingToParse,
}

impl DiagnosticKind {
    /// Kinds dropped in lenient mode, where fragments lack externally supplied values.
    pub const MISSING_VALUE_KINDS: [DiagnosticKind; 4] = [
        DiagnosticKind::MissingRequiredParameter,
        DiagnosticKind::MissingDefaultValue,
        DiagnosticKind::MissingRequiredInput,
        DiagnosticKind::MissingRequiredOutput,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::UnknownField => "UnknownFieldError",
            DiagnosticKind::MissingRequiredField => "MissingRequiredFieldError",
            DiagnosticKind::InvalidType => "InvalidTypeError",
            DiagnosticKind::InvalidValue => "InvalidValueError",
            DiagnosticKind::InvalidSchema => "InvalidSchemaError",
            DiagnosticKind::InvalidNodeType => "InvalidNodeTypeError",
            DiagnosticKind::InvalidPath => "InvalidPathError",
            DiagnosticKind::MissingRequiredInput => "MissingRequiredInputError",
            DiagnosticKind::MissingDefaultValue => "MissingDefaultValueError",
            DiagnosticKind::MissingRequiredOutput => "MissingRequiredOutputError",
            DiagnosticKind::UnknownOutput => "UnknownOutputError",
            DiagnosticKind::MissingRequiredParameter => "MissingRequiredParameterError",
            DiagnosticKind::InvalidTemplateVersion => "InvalidTemplateVersion",
            DiagnosticKind::UrlFailure => "URLException",
            DiagnosticKind::IoFailure => "IOError",
            DiagnosticKind::ParseFailure => "ParseError",
            DiagnosticKind::ImportFailure => "ImportError",
            DiagnosticKind::NothingToParse => "ValueError",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Issue {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Issue::UnknownField { .. } => DiagnosticKind::UnknownField,
            Issue::MissingRequiredField { .. } => DiagnosticKind::MissingRequiredField,
            Issue::InvalidType { .. } => DiagnosticKind::InvalidType,
            Issue::InvalidValue { .. } => DiagnosticKind::InvalidValue,
            Issue::InvalidSchema { .. } => DiagnosticKind::InvalidSchema,
            Issue::InvalidNodeType { .. } => DiagnosticKind::InvalidNodeType,
            Issue::InvalidPath { .. } => DiagnosticKind::InvalidPath,
            Issue::MissingRequiredInput { .. } => DiagnosticKind::MissingRequiredInput,
            Issue::MissingDefaultValue { .. } => DiagnosticKind::MissingDefaultValue,
            Issue::MissingRequiredOutput { .. } => DiagnosticKind::MissingRequiredOutput,
            Issue::UnknownOutput { .. } => DiagnosticKind::UnknownOutput,
            Issue::MissingRequiredParameter { .. } => DiagnosticKind::MissingRequiredParameter,
            Issue::InvalidTemplateVersion { .. } => DiagnosticKind::InvalidTemplateVersion,
            Issue::UrlFailure { .. } => DiagnosticKind::UrlFailure,
            Issue::IoFailure { .. } => DiagnosticKind::IoFailure,
            Issue::ParseFailure { .. } => DiagnosticKind::ParseFailure,
            Issue::ImportFailure { .. } => DiagnosticKind::ImportFailure,
            Issue::NothingToParse => DiagnosticKind::NothingToParse,
        }
    }

    pub fn unknown_field(what: impl Into<String>, field: impl Into<String>) -> Self {
        Issue::UnknownField {
            what: what.into(),
            field: field.into(),
        }
    }

    pub fn missing_field(what: impl Into<String>, required: impl Into<String>) -> Self {
        Issue::MissingRequiredField {
            what: what.into(),
            required: required.into(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Issue::InvalidValue {
            message: message.into(),
        }
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Issue::InvalidSchema {
            message: message.into(),
        }
    }
}

/// The single fatal outcome of template construction.
///
/// Raised once, at verification time, when any diagnostic survived collection.
/// The message enumerates every diagnostic in accumulation order.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The originating path, or `None` for a pre-parsed document.
    pub input: Option<String>,
    pub message: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationError {
    pub fn new(input: Option<String>, diagnostics: Vec<Diagnostic>) -> Self {
        let header = match &input {
            Some(path) => format!(
                "\nThe input \"{}\" failed validation with the following error(s): \n\n\t",
                path
            ),
            None => {
                "\nThe pre-parsed input failed validation with the following error(s): \n\n\t"
                    .to_string()
            }
        };
        let lines: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
        ValidationError {
            input,
            message: header + &lines.join("\n\t"),
            diagnostics,
        }
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind() == kind)
    }

    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind() == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_messages_render_their_fields() {
        let issue = Issue::MissingRequiredInput {
            what: "SubstitutionMappings with node_type example.App".into(),
            input_name: "port".into(),
        };
        assert_eq!(
            issue.to_string(),
            "SubstitutionMappings with node_type example.App is missing required input definition of input \"port\"."
        );
        assert_eq!(issue.kind(), DiagnosticKind::MissingRequiredInput);
    }

    #[test]
    fn lenient_kinds_cover_missing_values_only() {
        assert!(DiagnosticKind::MISSING_VALUE_KINDS.contains(&DiagnosticKind::MissingRequiredOutput));
        assert!(!DiagnosticKind::MISSING_VALUE_KINDS.contains(&DiagnosticKind::UnknownOutput));
    }
}
