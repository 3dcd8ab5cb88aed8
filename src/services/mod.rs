// Services module for the IPDraft PDF engine
// Contains the document-to-PDF pipeline stages

pub mod export;
pub mod formatting_rules;
pub mod layout;
pub mod markdown;
pub mod output_sink;
pub mod pdf_generator;
pub mod progress;
pub mod signature_parser;

// Re-export the pipeline entry points
pub use export::PdfExportService;
pub use formatting_rules::FormattingRulesService;
pub use layout::LayoutEngine;
pub use output_sink::{BufferSink, FileSink, OutputSink, SinkKind, StreamSink};
pub use pdf_generator::PdfGenerator;
pub use progress::{
    CallbackProgressReporter, ConsoleProgressReporter, NullProgressReporter, ProgressReporter,
};
pub use signature_parser::SignatureParser;
