use miette::Diagnostic;
use thiserror::Error;

/// Failures talking to the transformation service.
#[derive(Debug, Error, Diagnostic)]
pub enum TransformError {
    #[error("no API key configured for the assist service")]
    #[diagnostic(
        code(assist::missing_key),
        help("set FOLIO_API_KEY (or GEMINI_API_KEY) in the environment")
    )]
    MissingKey,

    #[error("failed to build the HTTP client")]
    #[diagnostic(code(assist::client))]
    Client {
        #[source]
        source: reqwest::Error,
    },

    #[error("request to the assist service failed")]
    #[diagnostic(code(assist::http))]
    Http {
        #[source]
        source: reqwest::Error,
    },

    #[error("assist service answered with status {status}")]
    #[diagnostic(code(assist::status))]
    Status { status: u16, body: String },

    #[error("assist service error: {message}")]
    #[diagnostic(code(assist::provider))]
    Provider { message: String },

    #[error("unexpected response from the assist service: {reason}")]
    #[diagnostic(code(assist::envelope))]
    Envelope { reason: String },
}
