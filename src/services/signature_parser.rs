// Signature block parser for the IPDraft PDF engine
// Extracts structured multi-party signing metadata from sentinel markers
// such as [SIGNATURE_BLOCK:assignor-signature]. Parsing never fails;
// malformed markers are dropped with a warning.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::domain::signature::{
    Alignment, BlockPlacement, ColumnLayout, MarkerKind, ParsedDocument, PartyLineType,
    SignatureBlockData, SignatureBlockGroup, SignatureLayout, SignatureMarker, SignatureParty,
};

static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
static MARKER_ID_REGEX: OnceLock<Regex> = OnceLock::new();
static ROLE_REGEX: OnceLock<Regex> = OnceLock::new();
static COLUMN_SPLIT_REGEX: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    MARKER_REGEX.get_or_init(|| {
        Regex::new(r"\[(SIGNATURE_BLOCK|INITIALS_BLOCK|NOTARY_BLOCK):([^\[\]]+)\]").unwrap()
    })
}

fn marker_id_regex() -> &'static Regex {
    MARKER_ID_REGEX.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap())
}

fn role_regex() -> &'static Regex {
    ROLE_REGEX.get_or_init(|| Regex::new(r"^[A-Z][A-Z \-]{1,}:$").unwrap())
}

fn column_split_regex() -> &'static Regex {
    COLUMN_SPLIT_REGEX.get_or_init(|| Regex::new(r"\t+| {2,}").unwrap())
}

/// Usable width of a Letter page between 1" side margins.
const USABLE_WIDTH: f32 = 468.0;
/// Gutter between the two columns of a side-by-side block.
const COLUMN_SPACING: f32 = 50.0;

const SIGNATURE_LINE_HEIGHT: f32 = 30.0;
const FIELD_LINE_HEIGHT: f32 = 20.0;
const PARTY_PADDING: f32 = 20.0;
/// Notary acknowledgment: 80 text + 30 signature + 40 commission + 20 seal.
const NOTARY_EXTRA_HEIGHT: f32 = 170.0;
/// Blocks taller than this prefer starting on a fresh page.
const NEW_PAGE_HEIGHT_THRESHOLD: f32 = 200.0;
/// Breathing room demanded below a block when placed.
const PLACEMENT_BUFFER: f32 = 50.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureParser;

impl SignatureParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a whole document: locate markers, extract each block's signing
    /// context, and return the text with the marker substrings removed.
    pub fn parse(&self, text: &str) -> ParsedDocument {
        let lines: Vec<&str> = text.lines().collect();
        let line_offsets = line_byte_offsets(text);

        let mut content_lines = Vec::new();
        let mut signature_blocks = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let markers = self.markers_in_line(line, line_offsets[idx]);
            if markers.is_empty() {
                content_lines.push(line.to_string());
                continue;
            }

            let stripped = marker_regex().replace_all(line, "");
            let stripped = stripped.trim_end();
            if !stripped.trim().is_empty() {
                content_lines.push(stripped.to_string());
            }

            for marker in markers {
                signature_blocks.push(self.extract_block(marker, &lines, idx));
            }
        }

        let has_signatures = !signature_blocks.is_empty();
        debug!(
            "Parsed {} signature blocks from {} source lines",
            signature_blocks.len(),
            lines.len()
        );

        ParsedDocument {
            content_lines,
            signature_blocks,
            has_signatures,
        }
    }

    /// Remove every marker-shaped substring from a line.
    pub fn strip_markers(line: &str) -> String {
        marker_regex().replace_all(line, "").to_string()
    }

    /// Ids of marker-shaped substrings that fail kebab-case validation.
    /// These markers are dropped from parsing; callers surface them as
    /// warnings on the export result.
    pub fn invalid_marker_ids(&self, text: &str) -> Vec<String> {
        marker_regex()
            .captures_iter(text)
            .filter_map(|caps| {
                let id = caps[2].to_string();
                if marker_id_regex().is_match(&id) {
                    None
                } else {
                    Some(id)
                }
            })
            .collect()
    }

    /// All valid markers in the document, in order of appearance.
    pub fn find_markers(&self, text: &str) -> Vec<SignatureMarker> {
        let line_offsets = line_byte_offsets(text);
        text.lines()
            .enumerate()
            .flat_map(|(idx, line)| self.markers_in_line(line, line_offsets[idx]))
            .collect()
    }

    fn markers_in_line(&self, line: &str, line_offset: usize) -> Vec<SignatureMarker> {
        let mut markers = Vec::new();
        for caps in marker_regex().captures_iter(line) {
            let full = caps.get(0).unwrap();
            let id = caps[2].to_string();
            if !marker_id_regex().is_match(&id) {
                warn!("Dropping signature marker with invalid id: {:?}", id);
                continue;
            }
            let kind = match &caps[1] {
                "SIGNATURE_BLOCK" => MarkerKind::Signature,
                "INITIALS_BLOCK" => MarkerKind::Initial,
                _ => MarkerKind::Notary,
            };
            markers.push(SignatureMarker {
                kind,
                id,
                full_marker: full.as_str().to_string(),
                start_index: line_offset + full.start(),
                end_index: line_offset + full.end(),
            });
        }
        markers
    }

    /// Walk forward from the marker collecting role and field lines until a
    /// terminator: a blank line after at least one party line, a section
    /// header, another marker, or a line that is not signing material.
    fn extract_block(&self, marker: SignatureMarker, lines: &[&str], marker_line: usize) -> SignatureBlockData {
        let line_type = match marker.kind {
            MarkerKind::Initial => PartyLineType::Initial,
            _ => PartyLineType::Signature,
        };
        let is_notary = marker.kind == MarkerKind::Notary;

        let mut parties: Vec<SignatureParty> = Vec::new();
        let mut layout = SignatureLayout::Single;
        let mut party_lines_seen = 0usize;
        let mut end_line = marker_line + 1;
        // Indices of the current left/right parties in side-by-side mode.
        let mut pair: Option<(usize, usize)> = None;

        for j in (marker_line + 1)..lines.len() {
            let raw = lines[j];
            let line = raw.trim();

            if line.is_empty() {
                if party_lines_seen > 0 {
                    break;
                }
                end_line = j + 1;
                continue;
            }

            if marker_regex().is_match(raw) {
                break;
            }

            let columns = split_columns(raw);
            if let Some((left, right)) = &columns {
                if is_role_line(left) && is_role_line(right) {
                    layout = SignatureLayout::SideBySide;
                    parties.push(SignatureParty::with_role(role_name(left), line_type));
                    parties.push(SignatureParty::with_role(role_name(right), line_type));
                    pair = Some((parties.len() - 2, parties.len() - 1));
                    party_lines_seen += 1;
                    end_line = j + 1;
                    continue;
                }
            }

            if layout == SignatureLayout::SideBySide {
                if let (Some((left_idx, right_idx)), Some((left, right))) = (pair, &columns) {
                    if is_party_material(left, is_notary) && is_party_material(right, is_notary) {
                        apply_party_line(&mut parties[left_idx], left, is_notary);
                        apply_party_line(&mut parties[right_idx], right, is_notary);
                        party_lines_seen += 1;
                        end_line = j + 1;
                        continue;
                    }
                }
            }

            if is_role_line(line) {
                parties.push(SignatureParty::with_role(role_name(line), line_type));
                pair = None;
                party_lines_seen += 1;
                end_line = j + 1;
                continue;
            }

            if is_section_header(line) {
                break;
            }

            if is_party_material(line, is_notary) {
                if parties.is_empty() {
                    parties.push(SignatureParty::new(line_type));
                }
                let current = if let (Some((left_idx, _)), SignatureLayout::SideBySide) = (pair, layout) {
                    left_idx
                } else {
                    parties.len() - 1
                };
                apply_party_line(&mut parties[current], line, is_notary);
                party_lines_seen += 1;
                end_line = j + 1;
                continue;
            }

            // Ordinary prose: the signing context is over.
            break;
        }

        SignatureBlockData {
            marker,
            layout,
            parties,
            notary_required: is_notary,
            context_range: (marker_line, end_line),
        }
    }

    /// Column geometry for rendering a block on a Letter page.
    pub fn analyze_layout(block: &SignatureBlockData) -> ColumnLayout {
        match block.layout {
            SignatureLayout::Single => ColumnLayout {
                columns: 1,
                column_width: USABLE_WIDTH,
                spacing: 0.0,
                alignment: Alignment::Left,
            },
            SignatureLayout::SideBySide => ColumnLayout {
                columns: 2,
                column_width: (USABLE_WIDTH - COLUMN_SPACING) / 2.0,
                spacing: COLUMN_SPACING,
                alignment: Alignment::Left,
            },
        }
    }

    /// Height of one party: its signature line, one line per present
    /// field, and trailing padding.
    pub fn party_height(party: &SignatureParty) -> f32 {
        SIGNATURE_LINE_HEIGHT + party.present_field_count() as f32 * FIELD_LINE_HEIGHT + PARTY_PADDING
    }

    /// Estimated height of a whole block for pagination. Side-by-side
    /// blocks stack parties in two columns and take the taller column;
    /// notary blocks append the fixed acknowledgment region.
    pub fn estimate_block_height(block: &SignatureBlockData) -> f32 {
        let base = match block.layout {
            SignatureLayout::Single => block.parties.iter().map(Self::party_height).sum(),
            SignatureLayout::SideBySide => {
                let split = (block.parties.len() + 1) / 2;
                let left: f32 = block.parties[..split].iter().map(Self::party_height).sum();
                let right: f32 = block.parties[split..].iter().map(Self::party_height).sum();
                left.max(right)
            }
        };
        if block.notary_required {
            base + NOTARY_EXTRA_HEIGHT
        } else {
            // A block with no parsed parties still occupies one field line.
            base.max(FIELD_LINE_HEIGHT)
        }
    }

    /// Group blocks whose marker ids share a prefix before `-signature` /
    /// `-notary`, preserving document order within each group.
    pub fn group_related_blocks(blocks: &[SignatureBlockData]) -> Vec<SignatureBlockGroup> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, SignatureBlockGroup> = HashMap::new();

        for block in blocks {
            let key = block.group_key().to_string();
            let entry = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                SignatureBlockGroup {
                    key,
                    block_ids: Vec::new(),
                    total_height: 0.0,
                }
            });
            entry.block_ids.push(block.marker.id.clone());
            entry.total_height += Self::estimate_block_height(block);
        }

        order.into_iter().filter_map(|key| groups.remove(&key)).collect()
    }

    /// Pagination policy: signature blocks never split; notary blocks and
    /// tall blocks prefer a fresh page.
    pub fn placement_strategy(block: &SignatureBlockData) -> BlockPlacement {
        let height = Self::estimate_block_height(block);
        BlockPlacement {
            prevent_break: true,
            prefer_new_page: block.notary_required || height > NEW_PAGE_HEIGHT_THRESHOLD,
            min_space_required: height + PLACEMENT_BUFFER,
        }
    }
}

/// Byte offset of the start of every line in `text`.
fn line_byte_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (pos, _) in text.match_indices('\n') {
        offsets.push(pos + 1);
    }
    offsets
}

/// Split a line into two column segments at a tab or a run of two or more
/// spaces. Returns None when there is no second column.
fn split_columns(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    let mut parts = column_split_regex().splitn(trimmed, 2);
    let left = parts.next()?.trim();
    let right = parts.next()?.trim();
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left.to_string(), right.to_string()))
}

fn is_role_line(line: &str) -> bool {
    role_regex().is_match(line.trim())
}

fn role_name(line: &str) -> String {
    line.trim().trim_end_matches(':').trim().to_string()
}

/// A line of underscores standing in for a wet signature.
fn is_signature_rule_line(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| c == '_')
}

/// Field labels recognized inside a signing context (case-insensitive).
fn field_key(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim().to_lowercase(), value.trim().to_string()))
}

fn is_field_label(line: &str) -> bool {
    match field_key(line) {
        Some((key, _)) => matches!(
            key.as_str(),
            "by" | "name"
                | "printed name"
                | "title"
                | "company"
                | "firm"
                | "date"
                | "notary public"
                | "my commission expires"
                | "commission #"
                | "commission no"
        ),
        None => false,
    }
}

fn is_notary_text_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.starts_with("state of ") || lower.starts_with("county of ")
}

/// Does this line carry signing information (as opposed to prose)?
fn is_party_material(line: &str, is_notary: bool) -> bool {
    is_signature_rule_line(line) || is_field_label(line) || (is_notary && is_notary_text_line(line))
}

/// A `:`-terminated line that is neither a role nor a field label marks
/// the start of the next document section.
fn is_section_header(line: &str) -> bool {
    line.ends_with(':') && !is_role_line(line) && !is_field_label(line)
}

/// Empty and underscore-only values are placeholders, not data.
fn field_value(value: String) -> Option<String> {
    if value.is_empty() || value.chars().all(|c| c == '_') {
        None
    } else {
        Some(value)
    }
}

fn apply_party_line(party: &mut SignatureParty, line: &str, is_notary: bool) {
    if is_signature_rule_line(line) {
        return;
    }

    if is_notary && is_notary_text_line(line) {
        let lower = line.to_lowercase();
        if lower.starts_with("state of ") {
            party.notary_state = field_value(line["state of ".len()..].trim().to_string());
        } else {
            party.notary_county = field_value(line["county of ".len()..].trim().to_string());
        }
        return;
    }

    if let Some((key, value)) = field_key(line) {
        let value = field_value(value);
        match key.as_str() {
            "by" | "name" | "printed name" => {
                if party.name.is_none() {
                    party.name = value;
                }
            }
            "title" => party.title = value,
            "company" | "firm" => party.company = value,
            "date" => party.date = value,
            "notary public" if is_notary => {
                if party.name.is_none() {
                    party.name = value;
                }
            }
            "my commission expires" if is_notary => party.commission_expires = value,
            "commission #" | "commission no" if is_notary => party.commission_number = value,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> SignatureParser {
        SignatureParser::new()
    }

    #[test]
    fn test_find_markers_all_kinds() {
        let text = "[SIGNATURE_BLOCK:assignor-signature]\nbody\n[INITIALS_BLOCK:assignee]\n[NOTARY_BLOCK:assignor-notary]";
        let markers = parser().find_markers(text);
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].kind, MarkerKind::Signature);
        assert_eq!(markers[0].id, "assignor-signature");
        assert_eq!(markers[1].kind, MarkerKind::Initial);
        assert_eq!(markers[2].kind, MarkerKind::Notary);
    }

    #[test]
    fn test_marker_offsets_cover_full_marker() {
        let text = "prefix [SIGNATURE_BLOCK:party-one] suffix";
        let markers = parser().find_markers(text);
        assert_eq!(markers.len(), 1);
        let m = &markers[0];
        assert_eq!(&text[m.start_index..m.end_index], "[SIGNATURE_BLOCK:party-one]");
    }

    #[test]
    fn test_invalid_ids_are_dropped() {
        for bad in ["Upper-case", "has_underscore", "9starts-with-digit", "-leading-dash"] {
            let text = format!("[SIGNATURE_BLOCK:{}]", bad);
            assert!(parser().find_markers(&text).is_empty(), "id {:?} should be dropped", bad);
        }
        assert_eq!(parser().find_markers("[SIGNATURE_BLOCK:ok-id2]").len(), 1);
    }

    #[test]
    fn test_marker_only_lines_are_dropped_from_content() {
        let text = "before\n[SIGNATURE_BLOCK:party-one]\nafter";
        let parsed = parser().parse(text);
        assert_eq!(parsed.content_lines, vec!["before", "after"]);
        assert!(parsed.has_signatures);
    }

    #[test]
    fn test_inline_marker_cut_in_place() {
        let text = "sign here [INITIALS_BLOCK:licensee] please";
        let parsed = parser().parse(text);
        assert_eq!(parsed.content_lines, vec!["sign here  please"]);
    }

    #[test]
    fn test_single_block_parse() {
        let text = "\
AGREEMENT

[SIGNATURE_BLOCK:assignor-signature]
ASSIGNOR:
_______________________
Name: John Doe
Title: CEO
Company: TechCorp Inc.

Further prose continues here.";
        let parsed = parser().parse(text);
        assert_eq!(parsed.signature_blocks.len(), 1);

        let block = &parsed.signature_blocks[0];
        assert_eq!(block.layout, SignatureLayout::Single);
        assert!(!block.notary_required);
        assert_eq!(block.parties.len(), 1);

        let party = &block.parties[0];
        assert_eq!(party.role.as_deref(), Some("ASSIGNOR"));
        assert_eq!(party.name.as_deref(), Some("John Doe"));
        assert_eq!(party.title.as_deref(), Some("CEO"));
        assert_eq!(party.company.as_deref(), Some("TechCorp Inc."));
        assert_eq!(party.line_type, PartyLineType::Signature);

        // Prose after the terminating blank line stays in the content.
        assert!(parsed.content_lines.iter().any(|l| l == "Further prose continues here."));
    }

    #[test]
    fn test_side_by_side_parse() {
        let text = "\
[SIGNATURE_BLOCK:license-parties]
LICENSOR:\tLICENSEE:
_______________________\t_______________________
Name: Alice Smith\tName: Bob Jones
";
        let parsed = parser().parse(text);
        assert_eq!(parsed.signature_blocks.len(), 1);

        let block = &parsed.signature_blocks[0];
        assert_eq!(block.layout, SignatureLayout::SideBySide);
        assert_eq!(block.parties.len(), 2);
        assert_eq!(block.parties[0].role.as_deref(), Some("LICENSOR"));
        assert_eq!(block.parties[0].name.as_deref(), Some("Alice Smith"));
        assert_eq!(block.parties[1].role.as_deref(), Some("LICENSEE"));
        assert_eq!(block.parties[1].name.as_deref(), Some("Bob Jones"));
    }

    #[test]
    fn test_side_by_side_with_spaces() {
        let text = "[SIGNATURE_BLOCK:parties]\nASSIGNOR:    ASSIGNEE:\nName: A B    Name: C D\n";
        let parsed = parser().parse(text);
        let block = &parsed.signature_blocks[0];
        assert_eq!(block.layout, SignatureLayout::SideBySide);
        assert_eq!(block.parties[0].name.as_deref(), Some("A B"));
        assert_eq!(block.parties[1].name.as_deref(), Some("C D"));
    }

    #[test]
    fn test_initials_block_line_type() {
        let text = "[INITIALS_BLOCK:licensee-initials]\nLICENSEE:\nName: Bob\n";
        let parsed = parser().parse(text);
        let block = &parsed.signature_blocks[0];
        assert_eq!(block.parties[0].line_type, PartyLineType::Initial);
    }

    #[test]
    fn test_notary_block_fields() {
        let text = "\
[NOTARY_BLOCK:assignor-notary]
State of California
County of Santa Clara
Notary Public: Jane Roe
My commission expires: 01/01/2027
Commission #: 123456
";
        let parsed = parser().parse(text);
        let block = &parsed.signature_blocks[0];
        assert!(block.notary_required);
        assert_eq!(block.parties.len(), 1);

        let party = &block.parties[0];
        assert_eq!(party.notary_state.as_deref(), Some("California"));
        assert_eq!(party.notary_county.as_deref(), Some("Santa Clara"));
        assert_eq!(party.name.as_deref(), Some("Jane Roe"));
        assert_eq!(party.commission_expires.as_deref(), Some("01/01/2027"));
        assert_eq!(party.commission_number.as_deref(), Some("123456"));
    }

    #[test]
    fn test_section_header_terminates_context() {
        let text = "\
[SIGNATURE_BLOCK:party-one]
ASSIGNOR:
Name: John Doe
Exhibit A:
Not a field";
        let parsed = parser().parse(text);
        let block = &parsed.signature_blocks[0];
        assert_eq!(block.parties.len(), 1);
        assert_eq!(block.parties[0].name.as_deref(), Some("John Doe"));
        // The section header and following text are outside the context.
        assert_eq!(block.context_range.1, 3);
    }

    #[test]
    fn test_underscore_values_are_placeholders() {
        let text = "[SIGNATURE_BLOCK:party-one]\nASSIGNOR:\nName: ____________\nDate: __________\n";
        let parsed = parser().parse(text);
        let party = &parsed.signature_blocks[0].parties[0];
        assert!(party.name.is_none());
        assert!(party.date.is_none());
    }

    #[test]
    fn test_analyze_layout_widths() {
        let text = "[SIGNATURE_BLOCK:one]\nASSIGNOR:\nName: A\n";
        let parsed = parser().parse(text);
        let single = SignatureParser::analyze_layout(&parsed.signature_blocks[0]);
        assert_eq!(single.columns, 1);
        assert_eq!(single.column_width, 468.0);

        let text = "[SIGNATURE_BLOCK:two]\nLICENSOR:\tLICENSEE:\n";
        let parsed = parser().parse(text);
        let double = SignatureParser::analyze_layout(&parsed.signature_blocks[0]);
        assert_eq!(double.columns, 2);
        assert_eq!(double.spacing, 50.0);
        assert_eq!(double.column_width, 209.0);
    }

    #[test]
    fn test_notary_height_model() {
        // One party with only a name: 30 + 20 + 20 padding + 170 notary.
        let text = "[NOTARY_BLOCK:assignor-notary]\nNotary Public: Jane Roe\n";
        let parsed = parser().parse(text);
        let block = &parsed.signature_blocks[0];
        assert_eq!(SignatureParser::estimate_block_height(block), 240.0);
    }

    #[test]
    fn test_side_by_side_height_uses_taller_column() {
        let text = "\
[SIGNATURE_BLOCK:parties]
LICENSOR:\tLICENSEE:
Name: A\tName: B
Title: CEO\tTitle: CTO
Company: X Corp\tCompany: Y Corp
";
        let parsed = parser().parse(text);
        let block = &parsed.signature_blocks[0];
        // Each column: 30 + 3*20 + 20 = 110; block height is one column.
        assert_eq!(SignatureParser::estimate_block_height(block), 110.0);
    }

    #[test]
    fn test_group_related_blocks() {
        let text = "\
[SIGNATURE_BLOCK:assignor-signature]
ASSIGNOR:
Name: John Doe

[NOTARY_BLOCK:assignor-notary]
State of California

[SIGNATURE_BLOCK:assignee-signature]
ASSIGNEE:
Name: Jane Roe
";
        let parsed = parser().parse(text);
        let groups = SignatureParser::group_related_blocks(&parsed.signature_blocks);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "assignor");
        assert_eq!(groups[0].block_ids, vec!["assignor-signature", "assignor-notary"]);
        assert_eq!(groups[1].key, "assignee");
    }

    #[test]
    fn test_placement_strategy() {
        let text = "[SIGNATURE_BLOCK:small]\nASSIGNOR:\nName: A\n";
        let parsed = parser().parse(text);
        let block = &parsed.signature_blocks[0];
        let placement = SignatureParser::placement_strategy(block);
        assert!(placement.prevent_break);
        assert!(!placement.prefer_new_page);
        assert_eq!(
            placement.min_space_required,
            SignatureParser::estimate_block_height(block) + 50.0
        );

        let text = "[NOTARY_BLOCK:big-notary]\nState of California\n";
        let parsed = parser().parse(text);
        let placement = SignatureParser::placement_strategy(&parsed.signature_blocks[0]);
        assert!(placement.prefer_new_page);
    }

    #[test]
    fn test_empty_document() {
        let parsed = parser().parse("");
        assert!(parsed.content_lines.is_empty());
        assert!(!parsed.has_signatures);
    }
}
