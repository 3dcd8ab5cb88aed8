// PDF generator for the IPDraft PDF engine
// Low-level writer over printpdf: page setup, cursor state, text and line
// primitives, page-number stamping. All coordinates in the public API are
// points with y measured down from the top edge of the page; conversion to
// printpdf's bottom-up millimeter space happens at the write boundary.

use anyhow::{bail, Context, Result};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Pt, Rgb,
};
use tracing::debug;

use crate::domain::signature::Alignment;
use crate::domain::{
    DocumentInfo, FormattingRules, InlineSegment, Margins, PageNumberFormat, PageNumberPosition,
    PageNumberStyle, PaperSize,
};
use crate::services::formatting_rules::FormattingRulesService;
use crate::services::markdown::{heading_font_size, heading_is_bold};
use crate::utils::text::{estimate_text_width, title_case, to_alpha, to_roman, wrap_text};

const PAGE_NUMBER_FONT_SIZE: f32 = 10.0;
const WATERMARK_FONT_SIZE: f32 = 48.0;

/// Options for a single low-level text write.
#[derive(Debug, Clone)]
pub struct TextOptions {
    pub font_size: Option<f32>,
    pub bold: bool,
    pub italic: bool,
    pub align: Alignment,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font_size: None,
            bold: false,
            italic: false,
            align: Alignment::Left,
        }
    }
}

struct FontSet {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
}

impl FontSet {
    fn select(&self, bold: bool, italic: bool) -> &IndirectFontRef {
        match (bold, italic) {
            (true, true) => &self.bold_italic,
            (true, false) => &self.bold,
            (false, true) => &self.italic,
            (false, false) => &self.regular,
        }
    }
}

/// Resolve a configured font face to the four builtin variants used for
/// regular, bold, italic and bold-italic runs. Unknown faces fall back to
/// the Times family, the default for legal filings.
fn builtin_family(face: &str) -> [BuiltinFont; 4] {
    match face.to_lowercase().as_str() {
        "helvetica" | "arial" | "sans" | "sans-serif" => [
            BuiltinFont::Helvetica,
            BuiltinFont::HelveticaBold,
            BuiltinFont::HelveticaOblique,
            BuiltinFont::HelveticaBoldOblique,
        ],
        "courier" | "monospace" => [
            BuiltinFont::Courier,
            BuiltinFont::CourierBold,
            BuiltinFont::CourierOblique,
            BuiltinFont::CourierBoldOblique,
        ],
        _ => [
            BuiltinFont::TimesRoman,
            BuiltinFont::TimesBold,
            BuiltinFont::TimesItalic,
            BuiltinFont::TimesBoldItalic,
        ],
    }
}

fn mm(points: f32) -> Mm {
    Mm::from(Pt(points))
}

pub struct PdfGenerator {
    rules: FormattingRules,
    paper: PaperSize,
    info: DocumentInfo,
    watermark: Option<String>,
    doc: Option<PdfDocumentReference>,
    fonts: Option<FontSet>,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    current_page: usize,
    x: f32,
    y: f32,
    finished: Option<Vec<u8>>,
}

impl PdfGenerator {
    pub fn new(rules: FormattingRules, paper: PaperSize, info: DocumentInfo) -> Self {
        Self {
            rules,
            paper,
            info,
            watermark: None,
            doc: None,
            fonts: None,
            pages: Vec::new(),
            current_page: 0,
            x: 0.0,
            y: 0.0,
            finished: None,
        }
    }

    pub fn with_watermark(mut self, watermark: Option<String>) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn page_width(&self) -> f32 {
        self.paper.dimensions().0
    }

    pub fn page_height(&self) -> f32 {
        self.paper.dimensions().1
    }

    /// Margins active on a page, honoring a first-page override.
    pub fn margins_for_page(&self, page_number: usize) -> Margins {
        if page_number == 1 {
            if let Some(first_page) = self.rules.first_page_margins {
                return first_page;
            }
        }
        self.rules.margins
    }

    pub fn current_x(&self) -> f32 {
        self.x
    }

    pub fn current_y(&self) -> f32 {
        self.y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_started(&self) -> bool {
        self.doc.is_some()
    }

    /// Open the document and its first page. Idempotent.
    pub fn start(&mut self) -> Result<()> {
        if self.doc.is_some() {
            return Ok(());
        }
        if self.finished.is_some() {
            bail!("generator already finalized");
        }

        let title = self.info.title.clone().unwrap_or_else(|| "Legal Document".to_string());
        let doc = PdfDocument::empty(title.clone());

        let faces = builtin_family(&self.rules.font_face);
        let fonts = FontSet {
            regular: doc.add_builtin_font(faces[0]).context("Failed to load document font")?,
            bold: doc.add_builtin_font(faces[1]).context("Failed to load bold font")?,
            italic: doc.add_builtin_font(faces[2]).context("Failed to load italic font")?,
            bold_italic: doc.add_builtin_font(faces[3]).context("Failed to load bold italic font")?,
        };

        self.doc = Some(doc);
        self.fonts = Some(fonts);
        self.add_page()?;
        debug!("PDF document opened: {:?}", title);
        Ok(())
    }

    fn add_page(&mut self) -> Result<()> {
        let doc = self.doc.as_ref().context("generator not started")?;
        let page_number = self.pages.len() + 1;
        let (page_idx, layer_idx) = doc.add_page(
            mm(self.page_width()),
            mm(self.page_height()),
            format!("Page {}", page_number),
        );
        self.pages.push((page_idx, layer_idx));
        self.current_page = self.pages.len() - 1;

        let margins = self.margins_for_page(page_number);
        self.x = margins.left;
        self.y = margins.top;

        if let Some(watermark) = self.watermark.clone() {
            self.draw_watermark(&watermark)?;
        }
        Ok(())
    }

    /// Start a new page and move the cursor to its top-left content corner.
    pub fn new_page(&mut self) -> Result<()> {
        if self.doc.is_none() {
            self.start()?;
            return Ok(());
        }
        self.add_page()
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    fn layer(&self) -> Result<PdfLayerReference> {
        let doc = self.doc.as_ref().context("generator not started")?;
        let (page_idx, layer_idx) = self.pages[self.current_page];
        Ok(doc.get_page(page_idx).get_layer(layer_idx))
    }

    fn layer_for(&self, page: usize) -> Result<PdfLayerReference> {
        let doc = self.doc.as_ref().context("generator not started")?;
        let (page_idx, layer_idx) = self.pages[page];
        Ok(doc.get_page(page_idx).get_layer(layer_idx))
    }

    /// Baseline y in printpdf space for text whose top sits at `top` in
    /// top-down coordinates.
    fn baseline(&self, top: f32, font_size: f32) -> f32 {
        self.page_height() - top - font_size
    }

    /// Write one run of text at the current cursor without advancing it.
    pub fn write_text(&mut self, text: &str, options: &TextOptions) -> Result<()> {
        let font_size = options.font_size.unwrap_or(self.rules.font_size);
        let margins = self.margins_for_page(self.current_page + 1);
        let x = match options.align {
            Alignment::Left => self.x,
            Alignment::Center => (self.page_width() - estimate_text_width(text, font_size)) / 2.0,
            Alignment::Right => {
                self.page_width() - margins.right - estimate_text_width(text, font_size)
            }
        };

        let layer = self.layer()?;
        let fonts = self.fonts.as_ref().context("generator not started")?;
        let font = fonts.select(options.bold, options.italic);
        layer.use_text(text, font_size, mm(x), mm(self.baseline(self.y, font_size)), font);
        Ok(())
    }

    /// Write styled segments left to right from the current cursor,
    /// advancing x across runs. The cursor y is untouched.
    pub fn write_segments(&mut self, segments: &[InlineSegment], font_size: f32) -> Result<()> {
        let layer = self.layer()?;
        let baseline = self.baseline(self.y, font_size);
        let mut x = self.x;

        {
            let fonts = self.fonts.as_ref().context("generator not started")?;
            for segment in segments {
                if segment.text.is_empty() {
                    continue;
                }
                let font = fonts.select(segment.bold, segment.italic);
                layer.use_text(&segment.text, font_size, mm(x), mm(baseline), font);
                x += estimate_text_width(&segment.text, font_size);
            }
        }

        self.x = x;
        Ok(())
    }

    /// Write a body paragraph: first line indented, wrapped to the usable
    /// width, advanced at the document line height, followed by the
    /// paragraph gap.
    pub fn write_paragraph(&mut self, text: &str) -> Result<()> {
        let margins = self.margins_for_page(self.current_page + 1);
        let usable_width = self.page_width() - margins.left - margins.right;
        let line_height =
            FormattingRulesService::compute_line_height(self.rules.font_size, self.rules.line_spacing);

        let indent = self.rules.paragraph_indent;
        let lines = wrap_text(text, usable_width - indent, self.rules.font_size);
        for (i, line) in lines.iter().enumerate() {
            self.x = if i == 0 { margins.left + indent } else { margins.left };
            self.write_text(line, &TextOptions::default())?;
            self.y += line_height;
        }
        self.x = margins.left;
        self.y += self.rules.paragraph_spacing;
        Ok(())
    }

    /// Write a heading at its level's size and weight, applying title
    /// casing when the document rules call for it.
    pub fn write_heading(&mut self, text: &str, level: u8) -> Result<()> {
        let margins = self.margins_for_page(self.current_page + 1);
        let font_size = heading_font_size(level);
        let line_height = FormattingRulesService::compute_line_height(font_size, self.rules.line_spacing);
        let rendered = if self.rules.title_case { title_case(text) } else { text.to_string() };

        let usable_width = self.page_width() - margins.left - margins.right;
        let lines = wrap_text(&rendered, usable_width, font_size);
        for line in &lines {
            self.x = margins.left;
            self.write_text(
                line,
                &TextOptions {
                    font_size: Some(font_size),
                    bold: heading_is_bold(level),
                    ..Default::default()
                },
            )?;
            self.y += line_height;
        }
        self.x = margins.left;
        Ok(())
    }

    /// Write a document title: uppercased, centered, 14 pt bold.
    pub fn write_title(&mut self, text: &str) -> Result<()> {
        let font_size = 14.0;
        let line_height = FormattingRulesService::compute_line_height(font_size, self.rules.line_spacing);
        let rendered = text.to_uppercase();

        self.write_text(
            &rendered,
            &TextOptions {
                font_size: Some(font_size),
                bold: true,
                align: Alignment::Center,
                ..Default::default()
            },
        )?;
        self.y += line_height;
        self.x = self.margins_for_page(self.current_page + 1).left;
        Ok(())
    }

    /// Advance the cursor by whole blank lines at the document line height.
    pub fn add_space(&mut self, lines: f32) {
        let line_height =
            FormattingRulesService::compute_line_height(self.rules.font_size, self.rules.line_spacing);
        self.y += lines * line_height;
    }

    /// Stroke a horizontal or arbitrary line in top-down point coordinates.
    pub fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32) -> Result<()> {
        let layer = self.layer()?;
        layer.set_outline_color(Color::Rgb(Rgb {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            icc_profile: None,
        }));
        layer.set_outline_thickness(thickness);
        layer.add_line(Line {
            points: vec![
                (Point::new(mm(x1), mm(self.page_height() - y1)), false),
                (Point::new(mm(x2), mm(self.page_height() - y2)), false),
            ],
            is_closed: false,
        });
        Ok(())
    }

    fn draw_watermark(&mut self, watermark: &str) -> Result<()> {
        let layer = self.layer()?;
        let fonts = self.fonts.as_ref().context("generator not started")?;
        layer.set_fill_color(Color::Rgb(Rgb {
            r: 0.85,
            g: 0.85,
            b: 0.85,
            icc_profile: None,
        }));
        let x = (self.page_width() - estimate_text_width(watermark, WATERMARK_FONT_SIZE)) / 2.0;
        let y = self.page_height() / 2.0;
        layer.use_text(watermark, WATERMARK_FONT_SIZE, mm(x), mm(y), &fonts.bold);
        layer.set_fill_color(Color::Rgb(Rgb {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            icc_profile: None,
        }));
        Ok(())
    }

    /// Stamp every page with its number in the configured style and
    /// position. Called after the document body is fully assembled.
    pub fn stamp_page_numbers(
        &mut self,
        position: PageNumberPosition,
        format: &PageNumberFormat,
    ) -> Result<()> {
        let fonts = self.fonts.as_ref().context("generator not started")?;
        let page_width = self.page_width();

        for page in 0..self.pages.len() {
            let number = format.starting_number + page as u32;
            let text = format_page_number(number, format);
            let margins = self.margins_for_page(page + 1);
            let width = estimate_text_width(&text, PAGE_NUMBER_FONT_SIZE);
            let x = match position {
                PageNumberPosition::BottomCenter => (page_width - width) / 2.0,
                PageNumberPosition::BottomRight => page_width - margins.right - width,
                PageNumberPosition::BottomLeft => margins.left,
            };
            let y = margins.bottom / 2.0;

            let layer = self.layer_for(page)?;
            layer.use_text(&text, PAGE_NUMBER_FONT_SIZE, mm(x), mm(y), &fonts.regular);
        }
        Ok(())
    }

    /// Close the document and return the full byte stream. Idempotent and
    /// safe to call when `start()` was never called.
    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        if let Some(bytes) = &self.finished {
            return Ok(bytes.clone());
        }

        let bytes = match self.doc.take() {
            Some(doc) => doc.save_to_bytes().context("Failed to serialize PDF document")?,
            None => Vec::new(),
        };
        self.fonts = None;
        self.finished = Some(bytes.clone());
        debug!("PDF document finalized: {} bytes", bytes.len());
        Ok(bytes)
    }
}

fn format_page_number(number: u32, format: &PageNumberFormat) -> String {
    let core = match format.style {
        PageNumberStyle::Numeric => number.to_string(),
        PageNumberStyle::Roman => to_roman(number),
        PageNumberStyle::Alpha => to_alpha(number),
    };
    format!(
        "{}{}{}",
        format.prefix.as_deref().unwrap_or(""),
        core,
        format.suffix.as_deref().unwrap_or("")
    )
}
