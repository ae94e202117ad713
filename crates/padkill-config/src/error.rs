use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(padkill::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(padkill::config::invalid))]
    Invalid { message: String },

    #[error("Invalid value for `{node}`: {message}")]
    #[diagnostic(code(padkill::config::invalid_value))]
    InvalidValue { node: String, message: String },

    #[error("Missing required field: {field}")]
    #[diagnostic(code(padkill::config::missing_field))]
    MissingField { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid_value(node: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            node: node.to_string(),
            message: message.into(),
        }
    }
}
