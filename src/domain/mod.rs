// Core domain models for the IPDraft PDF engine

pub mod layout;
pub mod signature;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Legal document classes recognized by the formatting-rules resolver.
/// Unknown tags are not an error; they simply resolve to default rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    ProvisionalPatentApplication,
    TrademarkApplication,
    OfficeActionResponse,
    NdaIpSpecific,
    PatentAssignmentAgreement,
    PatentLicenseAgreement,
    TechnologyTransferAgreement,
    CeaseAndDesistLetter,
}

impl DocumentType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "provisional-patent-application" => Some(Self::ProvisionalPatentApplication),
            "trademark-application" => Some(Self::TrademarkApplication),
            "office-action-response" => Some(Self::OfficeActionResponse),
            "nda-ip-specific" => Some(Self::NdaIpSpecific),
            "patent-assignment-agreement" => Some(Self::PatentAssignmentAgreement),
            "patent-license-agreement" => Some(Self::PatentLicenseAgreement),
            "technology-transfer-agreement" => Some(Self::TechnologyTransferAgreement),
            "cease-and-desist-letter" => Some(Self::CeaseAndDesistLetter),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::ProvisionalPatentApplication => "provisional-patent-application",
            Self::TrademarkApplication => "trademark-application",
            Self::OfficeActionResponse => "office-action-response",
            Self::NdaIpSpecific => "nda-ip-specific",
            Self::PatentAssignmentAgreement => "patent-assignment-agreement",
            Self::PatentLicenseAgreement => "patent-license-agreement",
            Self::TechnologyTransferAgreement => "technology-transfer-agreement",
            Self::CeaseAndDesistLetter => "cease-and-desist-letter",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LineSpacing {
    Single,
    OneHalf,
    Double,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PageNumberPosition {
    BottomCenter,
    BottomRight,
    BottomLeft,
}

/// Page margins in points (1/72 inch).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(72.0)
    }
}

/// Typographic rules resolved for a single document type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormattingRules {
    pub line_spacing: LineSpacing,
    pub font_size: f32,
    pub font_face: String,
    pub margins: Margins,
    pub page_number_position: PageNumberPosition,
    pub title_case: bool,
    pub section_numbering: bool,
    pub paragraph_indent: f32,
    pub paragraph_spacing: f32,
    pub block_quote_indent: f32,
    pub signature_line_spacing: LineSpacing,
    /// Margins for page 1 only, when they differ from the standard margins.
    pub first_page_margins: Option<Margins>,
}

impl Default for FormattingRules {
    fn default() -> Self {
        Self {
            line_spacing: LineSpacing::Double,
            font_size: 12.0,
            font_face: "Times-Roman".to_string(),
            margins: Margins::default(),
            page_number_position: PageNumberPosition::BottomCenter,
            title_case: false,
            section_numbering: false,
            paragraph_indent: 36.0,
            paragraph_spacing: 12.0,
            block_quote_indent: 36.0,
            signature_line_spacing: LineSpacing::Single,
            first_page_margins: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    Letter,
    Legal,
    A4,
}

impl PaperSize {
    /// Page dimensions in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PaperSize::Letter => (612.0, 792.0), // 8.5" x 11"
            PaperSize::Legal => (612.0, 1008.0), // 8.5" x 14"
            PaperSize::A4 => (595.0, 842.0),     // 210mm x 297mm
        }
    }
}

impl Default for PaperSize {
    fn default() -> Self {
        PaperSize::Letter
    }
}

/// Page dimensions; usable area is what remains inside a set of margins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    pub fn for_paper(paper: PaperSize) -> Self {
        let (width, height) = paper.dimensions();
        Self { width, height }
    }

    pub fn usable_area(&self, margins: &Margins) -> UsableArea {
        UsableArea {
            width: self.width - margins.left - margins.right,
            height: self.height - margins.top - margins.bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UsableArea {
    pub width: f32,
    pub height: f32,
}

/// A run of inline text with resolved emphasis flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineSegment {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl InlineSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    pub fn styled(text: impl Into<String>, bold: bool, italic: bool) -> Self {
        Self {
            text: text.into(),
            bold,
            italic,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeadingInfo {
    pub level: u8,
    pub text: String,
    pub original_line: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListItem {
    pub kind: ListKind,
    pub indent_level: usize,
    pub marker: String,
    pub text: String,
}

/// PDF document information dictionary fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Vec<String>,
}

/// Header content for document types that reserve first-page header space.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeaderInfo {
    pub application_number: Option<String>,
    pub response_date: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageNumberStyle {
    Numeric,
    Roman,
    Alpha,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageNumberFormat {
    pub style: PageNumberStyle,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub starting_number: u32,
}

impl Default for PageNumberFormat {
    fn default() -> Self {
        Self {
            style: PageNumberStyle::Numeric,
            prefix: None,
            suffix: None,
            starting_number: 1,
        }
    }
}

/// Caller-supplied export options. Every field is optional; unrecognized
/// fields in serialized form are ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportOptions {
    pub page_numbers: bool,
    pub page_number_format: Option<PageNumberFormat>,
    pub margins: Option<Margins>,
    pub line_spacing: Option<LineSpacing>,
    pub font_size: Option<f32>,
    pub paper_size: PaperSize,
    pub header: Option<HeaderInfo>,
    pub watermark: Option<String>,
    pub metadata: Option<DocumentInfo>,
    pub parse_markdown: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            page_numbers: true,
            page_number_format: None,
            margins: None,
            line_spacing: None,
            font_size: None,
            paper_size: PaperSize::Letter,
            header: None,
            watermark: None,
            metadata: None,
            parse_markdown: true,
        }
    }
}

/// Export artifact metadata stamped onto every result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportMetadata {
    pub document_type: String,
    pub generated_at: DateTime<Utc>,
    pub file_size: u64,
    pub generator: String,
    pub format_version: String,
}

/// Result of a completed export: either the accumulated bytes (buffer
/// exports) or the written file path, plus document statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PdfExportResult {
    pub buffer: Option<Vec<u8>>,
    pub file_path: Option<PathBuf>,
    pub page_count: usize,
    pub signature_block_count: usize,
    pub processing_time_ms: u64,
    pub estimated_reading_time_min: u32,
    pub has_overflow: bool,
    pub warnings: Vec<String>,
    pub metadata: ExportMetadata,
}
