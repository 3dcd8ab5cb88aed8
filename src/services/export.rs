// Export orchestrator for the IPDraft PDF engine
// The top-level facade: parse -> measure -> layout -> render -> finalize,
// reporting named progress milestones along the way.

use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::FormattingConfig;
use crate::domain::layout::{BlockContent, BlockType, LayoutBlock, LayoutResult};
use crate::domain::signature::SignatureBlockData;
use crate::domain::{
    DocumentType, ExportMetadata, ExportOptions, FormattingRules, PageGeometry, PdfExportResult,
};
use crate::error::ExportError;
use crate::services::formatting_rules::FormattingRulesService;
use crate::services::layout::{list_item_display, list_item_indent, BlockMeasurer, LayoutEngine};
use crate::services::markdown;
use crate::services::output_sink::{BufferSink, FileSink, OutputSink};
use crate::services::pdf_generator::{PdfGenerator, TextOptions};
use crate::services::progress::{NullProgressReporter, ProgressReporter};
use crate::services::signature_parser::SignatureParser;
use crate::utils::file_utils::get_file_size;
use crate::utils::text::{estimate_reading_time, wrap_text};

const GENERATOR_NAME: &str = "ipdraft";
const FORMAT_VERSION: &str = "1.0";
const TASK_NAME: &str = "PDF Export";

/// What the pipeline produced before the sink was drained.
struct PipelineOutput {
    bytes_written: u64,
    page_count: usize,
    signature_block_count: usize,
    has_overflow: bool,
    warnings: Vec<String>,
}

/// Top-level export service. Instances share no mutable state; hosts may
/// run several exports concurrently from clones of one service.
#[derive(Clone)]
pub struct PdfExportService {
    rules: FormattingRulesService,
    parser: SignatureParser,
    layout: LayoutEngine,
    reporter: Arc<dyn ProgressReporter>,
}

impl Default for PdfExportService {
    fn default() -> Self {
        Self::new(FormattingConfig::default())
    }
}

impl PdfExportService {
    pub fn new(config: FormattingConfig) -> Self {
        Self {
            rules: FormattingRulesService::new(config),
            parser: SignatureParser::new(),
            layout: LayoutEngine::new(),
            reporter: Arc::new(NullProgressReporter::new()),
        }
    }

    /// Replace the progress reporter. The default reporter is silent.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Export a document to a PDF file on disk.
    #[instrument(skip(self, text, options))]
    pub async fn export(
        &self,
        text: &str,
        output_path: &Path,
        doc_type: &str,
        options: ExportOptions,
    ) -> Result<PdfExportResult, ExportError> {
        info!("Exporting {} document to {:?}", doc_type, output_path);

        let mut sink = FileSink::create(output_path)
            .await
            .map_err(ExportError::from_pipeline)?;
        let mut result = self.run(text, doc_type, &options, &mut sink).await?;
        result.file_path = Some(output_path.to_path_buf());
        // The on-disk size is authoritative for file exports; the byte
        // count from the pipeline stands in if the file cannot be read.
        if let Ok(size) = get_file_size(output_path).await {
            result.metadata.file_size = size;
        }
        Ok(result)
    }

    /// Export a document to an in-memory buffer.
    #[instrument(skip(self, text, options))]
    pub async fn export_to_buffer(
        &self,
        text: &str,
        doc_type: &str,
        options: ExportOptions,
    ) -> Result<PdfExportResult, ExportError> {
        info!("Exporting {} document to buffer", doc_type);

        let mut sink = BufferSink::new();
        self.run(text, doc_type, &options, &mut sink).await
    }

    /// Run the full pipeline against any sink, translating failures into
    /// the public error taxonomy and keeping the reporter informed.
    pub async fn run(
        &self,
        text: &str,
        doc_type_tag: &str,
        options: &ExportOptions,
        sink: &mut dyn OutputSink,
    ) -> Result<PdfExportResult, ExportError> {
        let started = Instant::now();
        self.reporter.start(TASK_NAME);

        match self.run_pipeline(text, doc_type_tag, options, sink).await {
            Ok(output) => {
                let buffer = match sink.end().await {
                    Ok(buffer) => buffer,
                    Err(err) => {
                        let err = err.context("Failed to close output sink");
                        self.reporter.fail(&format!("{err:#}"));
                        return Err(ExportError::from_pipeline(err));
                    }
                };
                self.reporter.report("PDF export completed", None);
                self.reporter.complete();

                Ok(PdfExportResult {
                    buffer,
                    file_path: None,
                    page_count: output.page_count,
                    signature_block_count: output.signature_block_count,
                    processing_time_ms: started.elapsed().as_millis() as u64,
                    estimated_reading_time_min: estimate_reading_time(text),
                    has_overflow: output.has_overflow,
                    warnings: output.warnings,
                    metadata: ExportMetadata {
                        document_type: doc_type_tag.to_string(),
                        generated_at: Utc::now(),
                        file_size: output.bytes_written,
                        generator: GENERATOR_NAME.to_string(),
                        format_version: FORMAT_VERSION.to_string(),
                    },
                })
            }
            Err(err) => {
                self.reporter.fail(&format!("{err:#}"));
                sink.abort().await;
                Err(ExportError::from_pipeline(err))
            }
        }
    }

    async fn run_pipeline(
        &self,
        text: &str,
        doc_type_tag: &str,
        options: &ExportOptions,
        sink: &mut dyn OutputSink,
    ) -> Result<PipelineOutput> {
        let report = |step: &str| self.reporter.report(step, None);

        report("Initializing PDF components");
        let export_id = Uuid::new_v4();
        let doc_type = DocumentType::from_tag(doc_type_tag);
        let geometry = PageGeometry::for_paper(options.paper_size);
        debug!(
            "Export {} started: doc_type={:?}, sink={}",
            export_id,
            doc_type,
            sink.kind().as_str()
        );

        report("Loading document formatting rules");
        let rules = self.effective_rules(doc_type, options);
        let usable_width = geometry.width - rules.margins.left - rules.margins.right;

        report("Parsing signature blocks");
        let parsed = self.parser.parse(text);
        let mut warnings: Vec<String> = self
            .parser
            .invalid_marker_ids(text)
            .into_iter()
            .map(|id| format!("Dropped signature marker with invalid id: {}", id))
            .collect();

        report("Preparing document layout");
        let mut blocks = self.build_layout_blocks(text, &parsed.signature_blocks, &rules, options);

        report("Calculating page breaks");
        let rough = self.layout.paginate(&blocks, &rules, geometry);
        debug!("Preliminary pagination: {} pages", rough.total_pages);

        report("Starting PDF generation");
        let mut gen = PdfGenerator::new(
            rules.clone(),
            options.paper_size,
            options.metadata.clone().unwrap_or_default(),
        )
        .with_watermark(options.watermark.clone());
        gen.start()?;

        report("Measuring content for accurate pagination");
        let measurer = BlockMeasurer::new(&rules, usable_width);
        for block in &mut blocks {
            block.estimated_height = measurer.measure(block);
        }
        let layout = self.layout.paginate(&blocks, &rules, geometry);
        if layout.has_overflow {
            warnings.push("One or more blocks exceed the usable page height".to_string());
        }

        self.render_document(&mut gen, &layout, &rules, doc_type, options)?;

        report("Finalizing PDF document");
        if options.page_numbers {
            let format = options.page_number_format.clone().unwrap_or_default();
            gen.stamp_page_numbers(rules.page_number_position, &format)?;
        }
        let bytes = gen.finalize()?;
        sink.write(&bytes).await?;

        info!(
            "Export {} generated {} pages, {} bytes",
            export_id,
            layout.total_pages,
            bytes.len()
        );

        Ok(PipelineOutput {
            bytes_written: bytes.len() as u64,
            page_count: layout.total_pages,
            signature_block_count: parsed.signature_blocks.len(),
            has_overflow: layout.has_overflow,
            warnings,
        })
    }

    /// Document rules with per-export option overrides folded in.
    fn effective_rules(&self, doc_type: Option<DocumentType>, options: &ExportOptions) -> FormattingRules {
        let mut rules = self.rules.rules_for(doc_type);
        if let Some(margins) = options.margins {
            rules.margins = margins;
            rules.first_page_margins = None;
        }
        if let Some(line_spacing) = options.line_spacing {
            rules.line_spacing = line_spacing;
        }
        if let Some(font_size) = options.font_size {
            rules.font_size = font_size;
        }
        rules
    }

    /// Classify the source into layout blocks. Signature blocks are
    /// anchored where their markers appeared; the party lines their
    /// contexts consumed are represented by the structured rendering and
    /// skipped here.
    fn build_layout_blocks(
        &self,
        text: &str,
        signature_blocks: &[SignatureBlockData],
        rules: &FormattingRules,
        options: &ExportOptions,
    ) -> Vec<LayoutBlock> {
        let lines: Vec<&str> = text.lines().collect();

        let mut anchors: HashMap<usize, Vec<&SignatureBlockData>> = HashMap::new();
        let mut consumed = vec![false; lines.len()];
        for block in signature_blocks {
            let (start, end) = block.context_range;
            anchors.entry(start).or_default().push(block);
            for flag in consumed.iter_mut().take(end.min(lines.len())).skip(start + 1) {
                *flag = true;
            }
        }

        let rough_line_height =
            FormattingRulesService::compute_line_height(rules.font_size, rules.line_spacing);
        let mut blocks: Vec<LayoutBlock> = Vec::new();
        let mut paragraph: Vec<String> = Vec::new();
        let mut quote: Vec<String> = Vec::new();

        fn flush_paragraph(paragraph: &mut Vec<String>, blocks: &mut Vec<LayoutBlock>, line_height: f32) {
            if !paragraph.is_empty() {
                let text = paragraph.join(" ");
                blocks.push(LayoutBlock::text(text, line_height));
                paragraph.clear();
            }
        }

        fn flush_quote(quote: &mut Vec<String>, blocks: &mut Vec<LayoutBlock>, line_height: f32) {
            if !quote.is_empty() {
                let text = quote.join(" ");
                blocks.push(LayoutBlock::blockquote(text, line_height));
                quote.clear();
            }
        }

        for (idx, line) in lines.iter().enumerate() {
            if let Some(anchored) = anchors.get(&idx) {
                flush_paragraph(&mut paragraph, &mut blocks, rough_line_height);
                flush_quote(&mut quote, &mut blocks, rough_line_height);
                for data in anchored {
                    let height = SignatureParser::estimate_block_height(data);
                    blocks.push(LayoutBlock::signature((*data).clone(), height));
                }
                let residue = SignatureParser::strip_markers(line);
                if !residue.trim().is_empty() {
                    paragraph.push(markdown::extract_link_text(residue.trim_end()));
                }
                continue;
            }

            if consumed[idx] {
                continue;
            }

            if line.trim().is_empty() {
                flush_paragraph(&mut paragraph, &mut blocks, rough_line_height);
                flush_quote(&mut quote, &mut blocks, rough_line_height);
                continue;
            }

            if !options.parse_markdown {
                paragraph.push(line.trim_end().to_string());
                continue;
            }

            if markdown::is_heading(line) {
                flush_paragraph(&mut paragraph, &mut blocks, rough_line_height);
                flush_quote(&mut quote, &mut blocks, rough_line_height);
                if let Some(info) = markdown::parse_heading(line) {
                    blocks.push(LayoutBlock::heading(
                        markdown::extract_link_text(&info.text),
                        info.level,
                        rough_line_height,
                    ));
                }
            } else if markdown::is_horizontal_rule(line) {
                flush_paragraph(&mut paragraph, &mut blocks, rough_line_height);
                flush_quote(&mut quote, &mut blocks, rough_line_height);
                blocks.push(LayoutBlock::horizontal_rule(rough_line_height));
            } else if markdown::is_unordered_list_item(line) || markdown::is_ordered_list_item(line) {
                flush_paragraph(&mut paragraph, &mut blocks, rough_line_height);
                flush_quote(&mut quote, &mut blocks, rough_line_height);
                blocks.push(LayoutBlock::list_item(
                    markdown::extract_link_text(line.trim_end()),
                    rough_line_height,
                ));
            } else if markdown::is_block_quote(line) {
                flush_paragraph(&mut paragraph, &mut blocks, rough_line_height);
                quote.push(markdown::extract_link_text(&markdown::parse_block_quote(line)));
            } else {
                flush_quote(&mut quote, &mut blocks, rough_line_height);
                paragraph.push(markdown::extract_link_text(line.trim_end()));
            }
        }

        flush_paragraph(&mut paragraph, &mut blocks, rough_line_height);
        flush_quote(&mut quote, &mut blocks, rough_line_height);
        blocks
    }

    fn render_document(
        &self,
        gen: &mut PdfGenerator,
        layout: &LayoutResult,
        rules: &FormattingRules,
        doc_type: Option<DocumentType>,
        options: &ExportOptions,
    ) -> Result<()> {
        let total = layout.total_pages;

        for (i, page) in layout.pages.iter().enumerate() {
            if i > 0 {
                gen.new_page()?;
            }
            self.reporter
                .report(&format!("Rendering page {} of {}", i + 1, total), None);

            if i == 0 {
                self.render_first_page_header(gen, doc_type, options)?;
            }

            let margins = gen.margins_for_page(i + 1);
            let mut y = margins.top;
            for block in &page.blocks {
                y = self.render_block(gen, block, y, rules, options)?;
            }
        }
        Ok(())
    }

    /// Header content above the body for document types that reserve
    /// first-page header space, when the caller supplied any.
    fn render_first_page_header(
        &self,
        gen: &mut PdfGenerator,
        doc_type: Option<DocumentType>,
        options: &ExportOptions,
    ) -> Result<()> {
        let header = match &options.header {
            Some(header) => header,
            None => return Ok(()),
        };
        if !self.rules.needs_header_space(doc_type, 1) {
            return Ok(());
        }
        let content = match self.rules.header_content(doc_type, header) {
            Some(content) => content,
            None => return Ok(()),
        };

        let margins = gen.margins_for_page(1);
        let mut y = margins.top - 34.0;
        for line in content.lines() {
            gen.move_to(margins.left, y);
            gen.write_text(
                line,
                &TextOptions {
                    font_size: Some(10.0),
                    ..Default::default()
                },
            )?;
            y += 14.0;
        }
        Ok(())
    }

    fn render_block(
        &self,
        gen: &mut PdfGenerator,
        block: &LayoutBlock,
        y: f32,
        rules: &FormattingRules,
        options: &ExportOptions,
    ) -> Result<f32> {
        let page_number = gen.page_count().max(1);
        let margins = gen.margins_for_page(page_number);
        let left = margins.left;
        let usable_width = gen.page_width() - margins.left - margins.right;
        let line_height =
            FormattingRulesService::compute_line_height(rules.font_size, rules.line_spacing);

        match (&block.block_type, &block.content) {
            (BlockType::Signature, BlockContent::Signature(data)) => {
                self.layout.render_signature_block(gen, data, y)
            }
            (BlockType::Heading, content) => {
                gen.move_to(left, y);
                gen.write_heading(content.as_text(), block.heading_level.unwrap_or(1))?;
                Ok(y + block.estimated_height)
            }
            (BlockType::HorizontalRule, _) => {
                let mid = y + line_height / 2.0;
                gen.draw_line(left, mid, left + usable_width, mid, 0.75)?;
                Ok(y + block.estimated_height)
            }
            (BlockType::ListItem, content) => {
                let display = list_item_display(content.as_text());
                let indent = list_item_indent(content.as_text());
                let lines = wrap_text(&display, usable_width - indent, rules.font_size);
                let mut cursor = y;
                for line in &lines {
                    gen.move_to(left + indent, cursor);
                    gen.write_text(line, &TextOptions::default())?;
                    cursor += line_height;
                }
                Ok(y + block.estimated_height)
            }
            (BlockType::Blockquote, content) => {
                let indent = rules.block_quote_indent;
                let lines = wrap_text(content.as_text(), usable_width - indent, rules.font_size);
                let mut cursor = y;
                for line in &lines {
                    gen.move_to(left + indent, cursor);
                    gen.write_text(
                        line,
                        &TextOptions {
                            italic: true,
                            ..Default::default()
                        },
                    )?;
                    cursor += line_height;
                }
                Ok(y + block.estimated_height)
            }
            (_, content) => {
                let indent = rules.paragraph_indent;
                let lines = wrap_text(content.as_text(), usable_width - indent, rules.font_size);
                let mut cursor = y;
                for (i, line) in lines.iter().enumerate() {
                    let x = if i == 0 { left + indent } else { left };
                    gen.move_to(x, cursor);
                    if options.parse_markdown {
                        let segments = markdown::parse_inline_formatting(line);
                        gen.write_segments(&segments, rules.font_size)?;
                    } else {
                        gen.write_text(line, &TextOptions::default())?;
                    }
                    cursor += line_height;
                }
                Ok(y + block.estimated_height)
            }
        }
    }
}
