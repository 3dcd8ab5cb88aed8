// Layout engine for the IPDraft PDF engine
// Partitions measured blocks into pages under keep-with-next, unbreakable
// and orphan constraints, and renders signature and notary regions.

use anyhow::Result;
use tracing::{debug, warn};

use crate::domain::layout::{BlockContent, BlockType, LayoutBlock, LayoutPage, LayoutResult};
use crate::domain::signature::{
    PartyLineType, SignatureBlockData, SignatureLayout, SignatureParty,
};
use crate::domain::{FormattingRules, LineSpacing, PageGeometry};
use crate::services::formatting_rules::{DocumentElement, FormattingRulesService};
use crate::services::markdown::{
    heading_font_size, parse_list_item, strip_inline_formatting,
};
use crate::services::pdf_generator::PdfGenerator;
use crate::services::signature_parser::SignatureParser;
use crate::utils::text::wrap_text;

/// Default row height for side-by-side helper rows.
const SIDE_BY_SIDE_LINE_HEIGHT: f32 = 15.0;
/// Horizontal inset per list nesting level, plus one for the marker.
const LIST_INDENT_STEP: f32 = 18.0;
/// Length of the short rule drawn for initials.
const INITIALS_LINE_WIDTH: f32 = 90.0;

/// Pure measuring visitor: computes the rendered height of each block from
/// the same wrapping rules the renderer uses, without emitting bytes.
#[derive(Debug, Clone)]
pub struct BlockMeasurer {
    usable_width: f32,
    font_size: f32,
    line_spacing: LineSpacing,
    paragraph_indent: f32,
    paragraph_spacing: f32,
    block_quote_indent: f32,
}

impl BlockMeasurer {
    pub fn new(rules: &FormattingRules, usable_width: f32) -> Self {
        Self {
            usable_width,
            font_size: rules.font_size,
            line_spacing: rules.line_spacing,
            paragraph_indent: rules.paragraph_indent,
            paragraph_spacing: rules.paragraph_spacing,
            block_quote_indent: rules.block_quote_indent,
        }
    }

    fn line_height(&self, font_size: f32) -> f32 {
        FormattingRulesService::compute_line_height(font_size, self.line_spacing)
    }

    pub fn measure(&self, block: &LayoutBlock) -> f32 {
        match (&block.block_type, &block.content) {
            (BlockType::Signature, BlockContent::Signature(data)) => {
                SignatureParser::estimate_block_height(data)
            }
            (BlockType::Heading, content) => {
                let level = block.heading_level.unwrap_or(1);
                let font_size = heading_font_size(level);
                let lines = wrap_text(content.as_text(), self.usable_width, font_size);
                let element = match level {
                    1 => DocumentElement::Title,
                    2 | 3 => DocumentElement::Section,
                    _ => DocumentElement::Paragraph,
                };
                lines.len() as f32 * self.line_height(font_size)
                    + self.paragraph_spacing * element.spacing_multiplier()
            }
            (BlockType::ListItem, content) => {
                let indent = list_item_indent(content.as_text());
                let lines = wrap_text(
                    &list_item_display(content.as_text()),
                    self.usable_width - indent,
                    self.font_size,
                );
                lines.len() as f32 * self.line_height(self.font_size)
                    + self.paragraph_spacing * DocumentElement::List.spacing_multiplier()
            }
            (BlockType::Blockquote, content) => {
                let lines = wrap_text(
                    content.as_text(),
                    self.usable_width - self.block_quote_indent,
                    self.font_size,
                );
                lines.len() as f32 * self.line_height(self.font_size) + self.paragraph_spacing
            }
            (BlockType::HorizontalRule, _) => self.line_height(self.font_size),
            (_, content) => {
                let lines = wrap_text(
                    content.as_text(),
                    self.usable_width - self.paragraph_indent,
                    self.font_size,
                );
                lines.len() as f32 * self.line_height(self.font_size) + self.paragraph_spacing
            }
        }
    }
}

/// The usable height of a page under the given rules, honoring the
/// first-page margin override.
fn usable_height(rules: &FormattingRules, geometry: PageGeometry, page_number: usize) -> f32 {
    let margins = if page_number == 1 {
        rules.first_page_margins.unwrap_or(rules.margins)
    } else {
        rules.margins
    };
    geometry.usable_area(&margins).height
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine;

impl LayoutEngine {
    pub fn new() -> Self {
        Self
    }

    /// Assign blocks to pages. Keep-with-next runs travel as one group;
    /// unbreakable groups that cannot fit anywhere are placed on a fresh
    /// page once and flagged as overflow.
    pub fn paginate(
        &self,
        blocks: &[LayoutBlock],
        rules: &FormattingRules,
        geometry: PageGeometry,
    ) -> LayoutResult {
        let mut pages: Vec<LayoutPage> = Vec::new();
        let mut has_overflow = false;
        let mut page_number = 1usize;
        let mut current = LayoutPage::new(1, usable_height(rules, geometry, 1));

        let mut start_new_page = |pages: &mut Vec<LayoutPage>, current: &mut LayoutPage, page_number: &mut usize| {
            *page_number += 1;
            let fresh = LayoutPage::new(*page_number, usable_height(rules, geometry, *page_number));
            pages.push(std::mem::replace(current, fresh));
        };

        let mut i = 0;
        while i < blocks.len() {
            let end = group_end(blocks, i);
            let group = &blocks[i..end];
            let group_height: f32 = group.iter().map(|b| b.estimated_height).sum();

            if group_height <= current.remaining_height {
                for block in group {
                    current.push(block.clone());
                }
                i = end;
                continue;
            }

            if !current.blocks.is_empty() {
                start_new_page(&mut pages, &mut current, &mut page_number);
            }

            if group_height <= current.remaining_height {
                for block in group {
                    current.push(block.clone());
                }
            } else if group.iter().any(|b| !b.breakable) || group.len() == 1 {
                // Taller than a full page and not splittable: place once.
                warn!(
                    "Block group of height {:.0}pt exceeds the usable page height; content will overflow",
                    group_height
                );
                has_overflow = true;
                for block in group {
                    current.push(block.clone());
                }
            } else {
                for block in group {
                    if block.estimated_height > current.remaining_height && !current.blocks.is_empty() {
                        start_new_page(&mut pages, &mut current, &mut page_number);
                    }
                    if block.estimated_height > current.remaining_height {
                        has_overflow = true;
                    }
                    current.push(block.clone());
                }
            }
            i = end;
        }

        pages.push(current);
        self.repair_single_block_pages(&mut pages, rules, geometry);

        debug!("Paginated {} blocks onto {} pages", blocks.len(), pages.len());
        LayoutResult {
            total_pages: pages.len(),
            has_overflow,
            pages,
        }
    }

    /// No non-terminal page should hold a single block. Pull the next
    /// page's leading keep-group forward when it fits; otherwise defer the
    /// previous page's final block. Both moves are best-effort: when
    /// neither preserves fit and keep-with-next semantics, the page stays
    /// as laid out.
    fn repair_single_block_pages(
        &self,
        pages: &mut Vec<LayoutPage>,
        rules: &FormattingRules,
        geometry: PageGeometry,
    ) {
        let mut idx = 0;
        while idx + 1 < pages.len() {
            if pages[idx].blocks.len() == 1 {
                let pull_len = leading_group_len(&pages[idx + 1].blocks);
                let pull_height: f32 = pages[idx + 1].blocks[..pull_len]
                    .iter()
                    .map(|b| b.estimated_height)
                    .sum();

                if pull_height <= pages[idx].remaining_height {
                    let moved: Vec<LayoutBlock> = pages[idx + 1].blocks.drain(..pull_len).collect();
                    for block in moved {
                        pages[idx].push(block);
                    }
                    if pages[idx + 1].blocks.is_empty() {
                        pages.remove(idx + 1);
                    }
                } else if idx > 0 && pages[idx - 1].blocks.len() > 2 {
                    let prev_len = pages[idx - 1].blocks.len();
                    let tail_height = pages[idx - 1].blocks[prev_len - 1].estimated_height;
                    let splits_group = pages[idx - 1].blocks[prev_len - 2].keep_with_next;
                    if !splits_group && tail_height <= pages[idx].remaining_height {
                        let block = pages[idx - 1].blocks.pop().unwrap();
                        pages[idx].remaining_height =
                            (pages[idx].remaining_height - block.estimated_height).max(0.0);
                        pages[idx].blocks.insert(0, block);
                    }
                }
            }
            idx += 1;
        }

        for (i, page) in pages.iter_mut().enumerate() {
            page.page_number = i + 1;
            let capacity = usable_height(rules, geometry, i + 1);
            page.remaining_height = (capacity - page.used_height()).max(0.0);
        }
    }

    /// Build one row block per line pair, joined by a tab. All rows but the
    /// last keep with the next so the two columns stay on one page.
    pub fn prepare_side_by_side_layout(left: &[String], right: &[String]) -> Vec<LayoutBlock> {
        let rows = left.len().max(right.len());
        let mut blocks = Vec::with_capacity(rows);
        for i in 0..rows {
            let l = left.get(i).map(String::as_str).unwrap_or("");
            let r = right.get(i).map(String::as_str).unwrap_or("");
            let mut block = LayoutBlock::text(format!("{}\t{}", l, r), SIDE_BY_SIDE_LINE_HEIGHT);
            block.keep_with_next = i + 1 < rows;
            blocks.push(block);
        }
        blocks
    }

    pub fn calculate_side_by_side_height(left: &[String], right: &[String], line_height: f32) -> f32 {
        left.len().max(right.len()) as f32 * line_height
    }

    /// Partition lines into two columns, the left one taking the extra
    /// line for odd counts.
    pub fn split_content_for_columns(lines: &[String]) -> (Vec<String>, Vec<String>) {
        let split = (lines.len() + 1) / 2;
        (lines[..split].to_vec(), lines[split..].to_vec())
    }

    /// Render one signature block at `y` (top-down points) and return the
    /// y-offset below it. The returned offset is strictly greater than `y`.
    pub fn render_signature_block(
        &self,
        gen: &mut PdfGenerator,
        block: &SignatureBlockData,
        y: f32,
    ) -> Result<f32> {
        let columns = SignatureParser::analyze_layout(block);
        let margins = gen.margins_for_page(gen.page_count().max(1));
        let left_x = margins.left;
        let mut cursor = y;

        match block.layout {
            SignatureLayout::Single => {
                for party in &block.parties {
                    cursor = self.render_party(gen, party, left_x, cursor, columns.column_width)?;
                }
            }
            SignatureLayout::SideBySide => {
                // Each column stacks its own parties; the block ends below
                // the taller column, matching the height model.
                let split = (block.parties.len() + 1) / 2;
                let right_x = left_x + columns.column_width + columns.spacing;

                let mut left_cursor = cursor;
                for party in &block.parties[..split] {
                    left_cursor =
                        self.render_party(gen, party, left_x, left_cursor, columns.column_width)?;
                }

                let mut right_cursor = cursor;
                for party in &block.parties[split..] {
                    right_cursor =
                        self.render_party(gen, party, right_x, right_cursor, columns.column_width)?;
                }

                cursor = left_cursor.max(right_cursor);
            }
        }

        if block.notary_required {
            cursor = self.render_notary_section(gen, left_x, cursor, columns.column_width)?;
        }

        if cursor <= y {
            cursor = y + 20.0;
        }
        Ok(cursor)
    }

    /// Render one party column: role label, signature or initials rule,
    /// then one labelled line per present field. Returns the y below the
    /// party's padding; the consumed height matches `party_height`.
    fn render_party(
        &self,
        gen: &mut PdfGenerator,
        party: &SignatureParty,
        x: f32,
        y: f32,
        column_width: f32,
    ) -> Result<f32> {
        use crate::services::pdf_generator::TextOptions;

        let mut cursor = y;

        if let Some(role) = &party.role {
            gen.move_to(x, cursor + 2.0);
            gen.write_text(
                &format!("{}:", role.to_uppercase()),
                &TextOptions {
                    font_size: Some(12.0),
                    bold: true,
                    ..Default::default()
                },
            )?;
        }

        let line_width = match party.line_type {
            PartyLineType::Signature => column_width,
            PartyLineType::Initial => INITIALS_LINE_WIDTH.min(column_width),
        };
        gen.draw_line(x, cursor + 26.0, x + line_width, cursor + 26.0, 1.0)?;
        cursor += 30.0;

        let fields: [(&str, &Option<String>); 4] = [
            ("Name", &party.name),
            ("Title", &party.title),
            ("Company", &party.company),
            ("Date", &party.date),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                gen.move_to(x, cursor + 4.0);
                gen.write_text(
                    &format!("{}: {}", label, value),
                    &TextOptions {
                        font_size: Some(10.0),
                        ..Default::default()
                    },
                )?;
                cursor += 20.0;
            }
        }

        Ok(cursor + 20.0)
    }

    /// Fixed notary acknowledgment region: state/county blanks, the jurat
    /// line, a notary signature rule, and commission fields. Consumes the
    /// 170 points the height model reserves.
    fn render_notary_section(
        &self,
        gen: &mut PdfGenerator,
        x: f32,
        y: f32,
        column_width: f32,
    ) -> Result<f32> {
        use crate::services::pdf_generator::TextOptions;

        let options = TextOptions {
            font_size: Some(10.0),
            ..Default::default()
        };
        let mut cursor = y;

        gen.move_to(x, cursor + 4.0);
        gen.write_text("STATE OF _____________", &options)?;
        cursor += 20.0;

        gen.move_to(x, cursor + 4.0);
        gen.write_text("COUNTY OF ___________", &options)?;
        cursor += 20.0;

        gen.move_to(x, cursor + 4.0);
        gen.write_text(
            "Subscribed and sworn to before me this ____ day of _________, 20__",
            &options,
        )?;
        cursor += 40.0;

        gen.draw_line(x, cursor + 25.0, x + column_width * 0.6, cursor + 25.0, 1.0)?;
        cursor += 30.0;

        gen.move_to(x, cursor + 4.0);
        gen.write_text("Notary Public", &options)?;
        cursor += 20.0;

        gen.move_to(x, cursor + 4.0);
        gen.write_text("My Commission Expires: __________", &options)?;
        cursor += 20.0;

        // Space for the notary seal.
        cursor += 20.0;

        Ok(cursor)
    }
}

/// End (exclusive) of the keep-with-next group starting at `start`.
fn group_end(blocks: &[LayoutBlock], start: usize) -> usize {
    let mut end = start;
    while end < blocks.len() && blocks[end].keep_with_next {
        end += 1;
    }
    (end + 1).min(blocks.len())
}

/// Length of the keep-with-next group at the head of a page.
fn leading_group_len(blocks: &[LayoutBlock]) -> usize {
    let mut len = 1;
    while len < blocks.len() && blocks[len - 1].keep_with_next {
        len += 1;
    }
    len
}

/// Render text for a list item: marker plus the stripped item text.
pub fn list_item_display(line: &str) -> String {
    match parse_list_item(line) {
        Some(item) => format!("{} {}", item.marker, strip_inline_formatting(&item.text)),
        None => line.to_string(),
    }
}

/// Horizontal inset for a list item at its nesting depth.
pub fn list_item_indent(line: &str) -> f32 {
    match parse_list_item(line) {
        Some(item) => (item.indent_level as f32 + 1.0) * LIST_INDENT_STEP,
        None => LIST_INDENT_STEP,
    }
}
