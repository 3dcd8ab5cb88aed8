// Formatting rules service for the IPDraft PDF engine
// Resolves per-document-type typographic rules with host-supplied overrides

use tracing::debug;

use crate::config::FormattingConfig;
use crate::domain::{
    DocumentType, FormattingRules, HeaderInfo, LineSpacing, Margins, PageGeometry,
    PageNumberPosition, UsableArea,
};

/// Document elements that take a multiple of the paragraph spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentElement {
    Paragraph,
    Section,
    Title,
    List,
}

impl DocumentElement {
    pub fn spacing_multiplier(&self) -> f32 {
        match self {
            DocumentElement::Paragraph => 1.0,
            DocumentElement::Section => 1.5,
            DocumentElement::Title => 2.0,
            DocumentElement::List => 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormattingRulesService {
    config: FormattingConfig,
}

impl FormattingRulesService {
    pub fn new(config: FormattingConfig) -> Self {
        Self { config }
    }

    /// Resolve the rules for a document type. Unknown types (None) get the
    /// defaults: double spacing, 12 pt Times-Roman, 1" margins, bottom-center
    /// page numbers. Host overrides are merged shallowly on top.
    pub fn rules_for(&self, doc_type: Option<DocumentType>) -> FormattingRules {
        let mut rules = match doc_type {
            Some(doc_type) => Self::base_rules(doc_type),
            None => {
                debug!("Unknown document type, using default formatting rules");
                FormattingRules::default()
            }
        };

        if let Some(doc_type) = doc_type {
            if let Some(overrides) = self.config.overrides_for(doc_type) {
                overrides.apply(&mut rules);
            }
        }

        rules
    }

    fn base_rules(doc_type: DocumentType) -> FormattingRules {
        let defaults = FormattingRules::default();
        match doc_type {
            DocumentType::ProvisionalPatentApplication => FormattingRules {
                line_spacing: LineSpacing::Double,
                page_number_position: PageNumberPosition::BottomCenter,
                title_case: true,
                section_numbering: true,
                paragraph_indent: 36.0,
                ..defaults
            },
            DocumentType::OfficeActionResponse => FormattingRules {
                line_spacing: LineSpacing::Double,
                page_number_position: PageNumberPosition::BottomRight,
                title_case: true,
                section_numbering: true,
                paragraph_indent: 0.0,
                // USPTO responses leave room for the application header
                // above the body on the first page only.
                first_page_margins: Some(Margins {
                    top: 108.0,
                    ..Margins::default()
                }),
                ..defaults
            },
            DocumentType::TrademarkApplication => FormattingRules {
                line_spacing: LineSpacing::Single,
                page_number_position: PageNumberPosition::BottomCenter,
                title_case: false,
                section_numbering: false,
                paragraph_indent: 0.0,
                ..defaults
            },
            DocumentType::PatentAssignmentAgreement => FormattingRules {
                line_spacing: LineSpacing::OneHalf,
                page_number_position: PageNumberPosition::BottomCenter,
                title_case: true,
                section_numbering: true,
                paragraph_indent: 36.0,
                ..defaults
            },
            DocumentType::NdaIpSpecific => FormattingRules {
                line_spacing: LineSpacing::Single,
                page_number_position: PageNumberPosition::BottomRight,
                title_case: true,
                section_numbering: true,
                paragraph_indent: 36.0,
                ..defaults
            },
            DocumentType::PatentLicenseAgreement => FormattingRules {
                line_spacing: LineSpacing::Single,
                page_number_position: PageNumberPosition::BottomRight,
                title_case: true,
                section_numbering: true,
                paragraph_indent: 36.0,
                ..defaults
            },
            DocumentType::TechnologyTransferAgreement => FormattingRules {
                line_spacing: LineSpacing::Single,
                page_number_position: PageNumberPosition::BottomRight,
                title_case: true,
                section_numbering: true,
                paragraph_indent: 36.0,
                ..defaults
            },
            DocumentType::CeaseAndDesistLetter => FormattingRules {
                line_spacing: LineSpacing::Single,
                page_number_position: PageNumberPosition::BottomCenter,
                title_case: false,
                section_numbering: false,
                paragraph_indent: 0.0,
                ..defaults
            },
        }
    }

    /// Extra leading contributed by the line-spacing setting, in points.
    pub fn line_spacing_points(spacing: LineSpacing) -> f32 {
        match spacing {
            LineSpacing::Single => 0.0,
            LineSpacing::OneHalf => 6.0,
            LineSpacing::Double => 12.0,
        }
    }

    /// Height of one rendered line: the font's natural leading (1.2em)
    /// plus the line-spacing allowance.
    pub fn compute_line_height(font_size: f32, spacing: LineSpacing) -> f32 {
        font_size * 1.2 + Self::line_spacing_points(spacing)
    }

    /// Spacing to apply in the current context. Signature areas are always
    /// single spaced no matter what the document rule says.
    pub fn apply_line_spacing(&self, doc_type: Option<DocumentType>, is_signature_context: bool) -> f32 {
        let rules = self.rules_for(doc_type);
        let spacing = if is_signature_context {
            rules.signature_line_spacing
        } else {
            rules.line_spacing
        };
        Self::line_spacing_points(spacing)
    }

    /// Vertical gap after a document element, as a multiple of the
    /// document's paragraph spacing.
    pub fn element_spacing(&self, doc_type: Option<DocumentType>, element: DocumentElement) -> f32 {
        self.rules_for(doc_type).paragraph_spacing * element.spacing_multiplier()
    }

    /// The margins active on a given page. Only document types with a
    /// first-page override differ between page 1 and the rest.
    pub fn margins_for_page(&self, doc_type: Option<DocumentType>, page_number: usize) -> Margins {
        let rules = self.rules_for(doc_type);
        if page_number == 1 {
            if let Some(first_page) = rules.first_page_margins {
                return first_page;
            }
        }
        rules.margins
    }

    pub fn usable_page_area(&self, doc_type: Option<DocumentType>, page_number: usize) -> UsableArea {
        let margins = self.margins_for_page(doc_type, page_number);
        PageGeometry::letter().usable_area(&margins)
    }

    /// Whether this page reserves space for header content above the body.
    pub fn needs_header_space(&self, doc_type: Option<DocumentType>, page_number: usize) -> bool {
        doc_type == Some(DocumentType::OfficeActionResponse) && page_number == 1
    }

    /// Header text for document types that carry one, assembled from the
    /// pieces the caller supplied. Returns None when nothing is available.
    pub fn header_content(&self, doc_type: Option<DocumentType>, header: &HeaderInfo) -> Option<String> {
        if doc_type != Some(DocumentType::OfficeActionResponse) {
            return None;
        }

        let mut parts = Vec::new();
        if let Some(application_number) = &header.application_number {
            parts.push(format!("Application No.: {}", application_number));
        }
        if let Some(response_date) = &header.response_date {
            parts.push(format!("Response Date: {}", response_date));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormattingOverrides;

    fn service() -> FormattingRulesService {
        FormattingRulesService::new(FormattingConfig::default())
    }

    #[test]
    fn test_rules_table() {
        let svc = service();

        let ppa = svc.rules_for(Some(DocumentType::ProvisionalPatentApplication));
        assert_eq!(ppa.line_spacing, LineSpacing::Double);
        assert_eq!(ppa.page_number_position, PageNumberPosition::BottomCenter);
        assert_eq!(ppa.paragraph_indent, 36.0);
        assert!(ppa.title_case && ppa.section_numbering);

        let tm = svc.rules_for(Some(DocumentType::TrademarkApplication));
        assert_eq!(tm.line_spacing, LineSpacing::Single);
        assert_eq!(tm.paragraph_indent, 0.0);
        assert!(!tm.title_case && !tm.section_numbering);

        let paa = svc.rules_for(Some(DocumentType::PatentAssignmentAgreement));
        assert_eq!(paa.line_spacing, LineSpacing::OneHalf);

        for doc_type in [
            DocumentType::NdaIpSpecific,
            DocumentType::PatentLicenseAgreement,
            DocumentType::TechnologyTransferAgreement,
        ] {
            let rules = svc.rules_for(Some(doc_type));
            assert_eq!(rules.line_spacing, LineSpacing::Single);
            assert_eq!(rules.page_number_position, PageNumberPosition::BottomRight);
            assert_eq!(rules.paragraph_indent, 36.0);
        }

        let letter = svc.rules_for(Some(DocumentType::CeaseAndDesistLetter));
        assert_eq!(letter.line_spacing, LineSpacing::Single);
        assert_eq!(letter.page_number_position, PageNumberPosition::BottomCenter);

        // Common values across the whole table.
        for doc_type in [
            DocumentType::ProvisionalPatentApplication,
            DocumentType::TrademarkApplication,
            DocumentType::OfficeActionResponse,
            DocumentType::NdaIpSpecific,
            DocumentType::PatentAssignmentAgreement,
            DocumentType::PatentLicenseAgreement,
            DocumentType::TechnologyTransferAgreement,
            DocumentType::CeaseAndDesistLetter,
        ] {
            let rules = svc.rules_for(Some(doc_type));
            assert_eq!(rules.font_size, 12.0);
            assert_eq!(rules.font_face, "Times-Roman");
            assert_eq!(rules.margins.left, 72.0);
            assert_eq!(rules.margins.right, 72.0);
            assert_eq!(rules.margins.bottom, 72.0);
        }
    }

    #[test]
    fn test_unknown_type_gets_defaults() {
        let rules = service().rules_for(None);
        assert_eq!(rules.line_spacing, LineSpacing::Double);
        assert_eq!(rules.font_size, 12.0);
        assert_eq!(rules.margins, Margins::uniform(72.0));
        assert_eq!(rules.page_number_position, PageNumberPosition::BottomCenter);
    }

    #[test]
    fn test_line_spacing_points() {
        assert_eq!(FormattingRulesService::line_spacing_points(LineSpacing::Single), 0.0);
        assert_eq!(FormattingRulesService::line_spacing_points(LineSpacing::OneHalf), 6.0);
        assert_eq!(FormattingRulesService::line_spacing_points(LineSpacing::Double), 12.0);
    }

    #[test]
    fn test_compute_line_height_identity() {
        for spacing in [LineSpacing::Single, LineSpacing::OneHalf, LineSpacing::Double] {
            let expected = 12.0 * 1.2 + FormattingRulesService::line_spacing_points(spacing);
            assert_eq!(FormattingRulesService::compute_line_height(12.0, spacing), expected);
        }
    }

    #[test]
    fn test_signature_context_forces_single_spacing() {
        let svc = service();
        let doc_type = Some(DocumentType::ProvisionalPatentApplication);
        assert_eq!(svc.apply_line_spacing(doc_type, false), 12.0);
        assert_eq!(svc.apply_line_spacing(doc_type, true), 0.0);
    }

    #[test]
    fn test_element_spacing_multipliers() {
        let svc = service();
        let doc_type = Some(DocumentType::NdaIpSpecific);
        let base = svc.rules_for(doc_type).paragraph_spacing;
        assert_eq!(svc.element_spacing(doc_type, DocumentElement::Paragraph), base);
        assert_eq!(svc.element_spacing(doc_type, DocumentElement::Section), base * 1.5);
        assert_eq!(svc.element_spacing(doc_type, DocumentElement::Title), base * 2.0);
        assert_eq!(svc.element_spacing(doc_type, DocumentElement::List), base * 0.5);
    }

    #[test]
    fn test_office_action_first_page_margins() {
        let svc = service();
        let doc_type = Some(DocumentType::OfficeActionResponse);

        let page1 = svc.margins_for_page(doc_type, 1);
        assert_eq!(page1.top, 108.0);
        assert_eq!(page1.bottom, 72.0);
        assert_eq!(page1.left, 72.0);
        assert_eq!(page1.right, 72.0);

        let page2 = svc.margins_for_page(doc_type, 2);
        assert_eq!(page2.top, 72.0);

        let area1 = svc.usable_page_area(doc_type, 1);
        assert_eq!(area1.width, 468.0);
        assert_eq!(area1.height, 612.0);

        let area2 = svc.usable_page_area(doc_type, 2);
        assert_eq!(area2.height, 648.0);
    }

    #[test]
    fn test_other_types_have_uniform_page_margins() {
        let svc = service();
        let doc_type = Some(DocumentType::NdaIpSpecific);
        assert_eq!(svc.margins_for_page(doc_type, 1), svc.margins_for_page(doc_type, 5));
    }

    #[test]
    fn test_header_content() {
        let svc = service();
        let doc_type = Some(DocumentType::OfficeActionResponse);

        assert!(svc.needs_header_space(doc_type, 1));
        assert!(!svc.needs_header_space(doc_type, 2));
        assert!(!svc.needs_header_space(Some(DocumentType::NdaIpSpecific), 1));

        let header = HeaderInfo {
            application_number: Some("16/123,456".to_string()),
            response_date: Some("March 3, 2025".to_string()),
        };
        let content = svc.header_content(doc_type, &header).unwrap();
        assert!(content.contains("Application No.: 16/123,456"));
        assert!(content.contains("Response Date: March 3, 2025"));

        assert!(svc.header_content(doc_type, &HeaderInfo::default()).is_none());
        assert!(svc.header_content(Some(DocumentType::NdaIpSpecific), &header).is_none());
    }

    #[test]
    fn test_config_overrides_merge_shallowly() {
        let config = FormattingConfig::new().with_override(
            DocumentType::NdaIpSpecific,
            FormattingOverrides {
                font_size: Some(11.0),
                ..Default::default()
            },
        );
        let svc = FormattingRulesService::new(config);

        let nda = svc.rules_for(Some(DocumentType::NdaIpSpecific));
        assert_eq!(nda.font_size, 11.0);
        // Non-overridden fields keep the built-in values.
        assert_eq!(nda.line_spacing, LineSpacing::Single);
        assert_eq!(nda.page_number_position, PageNumberPosition::BottomRight);

        // Other document types are untouched.
        let ppa = svc.rules_for(Some(DocumentType::ProvisionalPatentApplication));
        assert_eq!(ppa.font_size, 12.0);
    }
}
