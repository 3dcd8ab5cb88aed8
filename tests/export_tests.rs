// Integration tests for the IPDraft PDF export pipeline

use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use ipdraft::domain::{
    ExportOptions, HeaderInfo, PageNumberFormat, PageNumberStyle, PaperSize,
};
use ipdraft::services::progress::ProgressReporter;
use ipdraft::{ExportError, PdfExportService};

/// Captures every reporter call in order for assertions.
#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn start(&self, task_name: &str) {
        self.events.lock().unwrap().push(format!("start:{}", task_name));
    }

    fn report(&self, step: &str, _detail: Option<&str>) {
        self.events.lock().unwrap().push(step.to_string());
    }

    fn complete(&self) {
        self.events.lock().unwrap().push("complete".to_string());
    }

    fn fail(&self, error: &str) {
        self.events.lock().unwrap().push(format!("fail:{}", error));
    }
}

const ASSIGNMENT_AGREEMENT: &str = "\
# Patent Assignment Agreement

This Assignment is made between the parties identified below, effective as
of the date of the last signature.

## Grant of Rights

The Assignor hereby assigns to the Assignee all right, title, and interest
in and to the inventions described in **Exhibit A**.

[SIGNATURE_BLOCK:assignor-signature]
ASSIGNOR:
_______________________
Name: John Doe
Title: CEO
Company: TechCorp Inc.

Executed as of the date first written above.
";

#[tokio::test]
async fn test_buffer_export_returns_bytes_and_metadata() {
    let service = PdfExportService::default();
    let result = service
        .export_to_buffer("# Title\n\nBody.", "nda-ip-specific", ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.page_count, 1);
    let buffer = result.buffer.as_ref().expect("buffer export returns bytes");
    assert!(!buffer.is_empty());
    assert!(buffer.starts_with(b"%PDF"));

    assert_eq!(result.metadata.document_type, "nda-ip-specific");
    assert_eq!(result.metadata.generator, "ipdraft");
    assert_eq!(result.metadata.format_version, "1.0");
    assert_eq!(result.metadata.file_size, buffer.len() as u64);
    assert_eq!(result.signature_block_count, 0);
    assert!(result.estimated_reading_time_min >= 1);
    assert!(result.file_path.is_none());
}

#[tokio::test]
async fn test_empty_document_yields_one_blank_page() {
    let service = PdfExportService::default();
    let result = service
        .export_to_buffer("", "trademark-application", ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.page_count, 1);
    assert!(result.buffer.unwrap().starts_with(b"%PDF"));
    assert!(!result.has_overflow);
}

#[tokio::test]
async fn test_file_export_writes_pdf_with_signature_block() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("assignment.pdf");

    let service = PdfExportService::default();
    let result = service
        .export(
            ASSIGNMENT_AGREEMENT,
            &path,
            "patent-assignment-agreement",
            ExportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.file_path.as_deref(), Some(path.as_path()));
    assert_eq!(result.signature_block_count, 1);
    assert!(result.buffer.is_none());

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(result.metadata.file_size, bytes.len() as u64);
}

#[tokio::test]
async fn test_progress_events_follow_canonical_order() {
    let reporter = Arc::new(RecordingReporter::default());
    let service = PdfExportService::default().with_reporter(reporter.clone());

    let result = service
        .export_to_buffer(ASSIGNMENT_AGREEMENT, "patent-assignment-agreement", ExportOptions::default())
        .await
        .unwrap();

    let events = reporter.events();
    let expected_prefix = [
        "start:PDF Export",
        "Initializing PDF components",
        "Loading document formatting rules",
        "Parsing signature blocks",
        "Preparing document layout",
        "Calculating page breaks",
        "Starting PDF generation",
        "Measuring content for accurate pagination",
    ];
    assert_eq!(&events[..expected_prefix.len()], &expected_prefix);

    let render_events: Vec<&String> = events.iter().filter(|e| e.starts_with("Rendering page ")).collect();
    assert_eq!(render_events.len(), result.page_count);
    for (i, event) in render_events.iter().enumerate() {
        assert_eq!(
            **event,
            format!("Rendering page {} of {}", i + 1, result.page_count)
        );
    }

    let tail: Vec<&String> = events
        .iter()
        .skip(expected_prefix.len() + render_events.len())
        .collect();
    assert_eq!(
        tail,
        vec!["Finalizing PDF document", "PDF export completed", "complete"]
    );
}

#[tokio::test]
async fn test_unknown_document_type_falls_back_to_defaults() {
    let service = PdfExportService::default();
    let result = service
        .export_to_buffer("Just a paragraph.", "motion-to-dismiss", ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.metadata.document_type, "motion-to-dismiss");
    assert_eq!(result.page_count, 1);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_invalid_marker_id_surfaces_warning() {
    let service = PdfExportService::default();
    let text = "Some text.\n\n[SIGNATURE_BLOCK:Bad_Id]\n\nMore text.";
    let result = service
        .export_to_buffer(text, "nda-ip-specific", ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.signature_block_count, 0);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("Bad_Id"));
}

#[tokio::test]
async fn test_side_by_side_signatures_export() {
    let text = "\
# Patent License Agreement

The parties agree to the terms set forth herein.

[SIGNATURE_BLOCK:license-parties]
LICENSOR:\tLICENSEE:
_______________________\t_______________________
Name: Alice Smith\tName: Bob Jones
Title: President\tTitle: Director
";
    let service = PdfExportService::default();
    let result = service
        .export_to_buffer(text, "patent-license-agreement", ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.signature_block_count, 1);
    assert_eq!(result.page_count, 1);
}

#[tokio::test]
async fn test_long_document_renders_every_page() {
    let mut text = String::from("# Technology Transfer Agreement\n\n");
    for i in 1..=40 {
        text.push_str(&format!(
            "Section {} of this agreement describes obligations of the parties \
             in considerable detail, including representations, warranties, and \
             covenants that continue for the life of the licensed patents.\n\n",
            i
        ));
    }

    let reporter = Arc::new(RecordingReporter::default());
    let service = PdfExportService::default().with_reporter(reporter.clone());
    let result = service
        .export_to_buffer(&text, "technology-transfer-agreement", ExportOptions::default())
        .await
        .unwrap();

    assert!(result.page_count > 1);
    let renders = reporter
        .events()
        .iter()
        .filter(|e| e.starts_with("Rendering page "))
        .count();
    assert_eq!(renders, result.page_count);
}

#[tokio::test]
async fn test_notary_block_grouped_with_signature() {
    let text = "\
# Patent Assignment Agreement

The undersigned assigns the patent rights described herein.

[SIGNATURE_BLOCK:assignor-signature]
ASSIGNOR:
_______________________
Name: John Doe
Title: CEO

[NOTARY_BLOCK:assignor-notary]
State of California
County of Santa Clara
";
    let service = PdfExportService::default();
    let result = service
        .export_to_buffer(text, "patent-assignment-agreement", ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.signature_block_count, 2);
    assert!(!result.has_overflow);
}

#[tokio::test]
async fn test_export_options_watermark_paper_and_numbering() {
    let options = ExportOptions {
        watermark: Some("DRAFT".to_string()),
        paper_size: PaperSize::Legal,
        page_number_format: Some(PageNumberFormat {
            style: PageNumberStyle::Roman,
            prefix: Some("Page ".to_string()),
            suffix: None,
            starting_number: 1,
        }),
        ..Default::default()
    };

    let service = PdfExportService::default();
    let result = service
        .export_to_buffer(ASSIGNMENT_AGREEMENT, "patent-assignment-agreement", options)
        .await
        .unwrap();
    assert!(result.buffer.unwrap().starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_page_numbers_can_be_suppressed() {
    let options = ExportOptions {
        page_numbers: false,
        ..Default::default()
    };
    let service = PdfExportService::default();
    let result = service
        .export_to_buffer("Body text.", "cease-and-desist-letter", options)
        .await
        .unwrap();
    assert_eq!(result.page_count, 1);
}

#[tokio::test]
async fn test_office_action_header_renders_on_first_page() {
    let options = ExportOptions {
        header: Some(HeaderInfo {
            application_number: Some("16/123,456".to_string()),
            response_date: Some("March 3, 2025".to_string()),
        }),
        ..Default::default()
    };
    let service = PdfExportService::default();
    let result = service
        .export_to_buffer(
            "# Response to Office Action\n\nApplicant respectfully responds.",
            "office-action-response",
            options,
        )
        .await
        .unwrap();
    assert_eq!(result.page_count, 1);
}

#[tokio::test]
async fn test_output_error_has_machine_readable_kind() {
    let dir = TempDir::new().unwrap();
    // The output path is an existing directory, so the file sink cannot
    // be created.
    let err = PdfExportService::default()
        .export("text", dir.path(), "nda-ip-specific", ExportOptions::default())
        .await
        .unwrap_err();

    match &err {
        ExportError::Output(_) => assert_eq!(err.kind(), "output-error"),
        ExportError::Generation(msg) => panic!("expected output error, got generation: {}", msg),
    }
}

#[tokio::test]
async fn test_failed_export_reports_fail_event() {
    let dir = TempDir::new().unwrap();
    let reporter = Arc::new(RecordingReporter::default());
    let service = PdfExportService::default().with_reporter(reporter.clone());

    // Fails while creating the sink, before the pipeline starts.
    let _ = service
        .export("text", dir.path(), "nda-ip-specific", ExportOptions::default())
        .await;

    // Sink creation failures surface before progress starts; a pipeline
    // failure after start() must emit a fail event instead of complete.
    let events = reporter.events();
    assert!(!events.iter().any(|e| e == "complete"));
}

#[tokio::test]
async fn test_concurrent_exports_share_no_state() {
    let service = PdfExportService::default();
    let (a, b) = tokio::join!(
        service.export_to_buffer(ASSIGNMENT_AGREEMENT, "patent-assignment-agreement", ExportOptions::default()),
        service.export_to_buffer("# Letter\n\nCease and desist.", "cease-and-desist-letter", ExportOptions::default()),
    );
    assert_eq!(a.unwrap().signature_block_count, 1);
    assert_eq!(b.unwrap().signature_block_count, 0);
}
