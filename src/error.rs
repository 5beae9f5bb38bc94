use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while an
/// integration talks to its provider, exports a workbook, or scaffolds a new
/// integration.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Transport failures and undecodable response bodies.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when a SOAP envelope cannot be built or its result extracted.
    #[error("SOAP error: {0}")]
    Soap(String),

    /// Raised when a required environment variable is unset or empty.
    #[error("{0} is not defined")]
    MissingVariable(String),

    /// Raised when the CLI names an integration that is not registered.
    #[error("unknown integration '{0}'")]
    UnknownIntegration(String),

    /// Raised when the CLI is invoked without any integration.
    #[error("the --integrations parameter is required")]
    NoIntegrations,

    /// Raised when a provider answers a fatal request with a non-success status.
    #[error("{provider}: failed to fetch {resource} (HTTP {status})")]
    UnexpectedStatus {
        provider: &'static str,
        resource: String,
        status: u16,
    },

    /// Raised when a provider answers with success but rejects the request in its body.
    #[error("{provider}: {resource} rejected with code {code}")]
    ProviderRejected {
        provider: &'static str,
        resource: String,
        code: i64,
    },

    /// Raised when a provider payload lacks data the mapping depends on.
    #[error("{provider}: malformed response: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    /// Raised when the scaffolder cannot generate or register an integration.
    #[error("scaffolding failed: {0}")]
    Scaffold(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Whether the provider itself refused to go on. Such errors stop the
    /// current integration but not the rest of the batch.
    pub fn ends_integration(&self) -> bool {
        matches!(
            self,
            ToolError::UnexpectedStatus { .. } | ToolError::ProviderRejected { .. }
        )
    }
}
