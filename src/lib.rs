// IPDraft PDF Engine - legal document to PDF pipeline
// Copyright (c) 2025 IPDraft Team
//
// Converts Markdown-flavored legal drafts with embedded signature markers
// into paginated PDFs following U.S. intellectual-property conventions.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Module declarations
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod utils;

// Commonly used entry points
pub use config::{FormattingConfig, FormattingOverrides};
pub use domain::{DocumentType, ExportOptions, FormattingRules, PdfExportResult};
pub use error::ExportError;
pub use services::export::PdfExportService;
pub use services::progress::{
    CallbackProgressReporter, ConsoleProgressReporter, NullProgressReporter, ProgressReporter,
};

/// Initialize structured logging for hosts that embed the engine. Safe to
/// skip; the engine only emits through `tracing` and never installs a
/// subscriber on its own.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ipdraft=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
