// Error taxonomy for the IPDraft PDF engine

use thiserror::Error;

/// Public error surfaced by the export orchestrator.
///
/// Parsers and layout never fail on well-formed input; the only errors that
/// reach callers are sink I/O failures and unexpected generation failures.
/// Each variant carries a machine-readable kind for hosts that route errors
/// without string matching.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("output error: {0}")]
    Output(#[source] std::io::Error),

    #[error("PDF generation failed: {0}")]
    Generation(String),
}

impl ExportError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::Output(_) => "output-error",
            ExportError::Generation(_) => "generation-failure",
        }
    }

    /// Collapse an internal pipeline error into the public taxonomy. I/O
    /// errors anywhere in the chain are reported as output errors; everything
    /// else is a generation failure with the full context chain flattened
    /// into the message.
    pub(crate) fn from_pipeline(err: anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                return ExportError::Output(std::io::Error::new(io_err.kind(), format!("{err:#}")));
            }
        }
        ExportError::Generation(format!("{err:#}"))
    }
}
