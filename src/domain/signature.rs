// Signature block domain models
// Structured signing metadata extracted from sentinel markers in document text

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Signature,
    Initial,
    Notary,
}

/// A recognized sentinel marker, e.g. `[SIGNATURE_BLOCK:assignor-signature]`.
/// Offsets are byte positions of the full marker within the source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureMarker {
    pub kind: MarkerKind,
    pub id: String,
    pub full_marker: String,
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartyLineType {
    Signature,
    Initial,
}

/// A single signing party and the fields present for it in the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureParty {
    pub role: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub date: Option<String>,
    pub line_type: PartyLineType,
    pub notary_county: Option<String>,
    pub notary_state: Option<String>,
    pub commission_expires: Option<String>,
    pub commission_number: Option<String>,
}

impl SignatureParty {
    pub fn new(line_type: PartyLineType) -> Self {
        Self {
            role: None,
            name: None,
            title: None,
            company: None,
            date: None,
            line_type,
            notary_county: None,
            notary_state: None,
            commission_expires: None,
            commission_number: None,
        }
    }

    pub fn with_role(role: impl Into<String>, line_type: PartyLineType) -> Self {
        let mut party = Self::new(line_type);
        party.role = Some(role.into());
        party
    }

    /// Count of present fields that occupy a rendered line under the
    /// signature rule (name, title, company, date).
    pub fn present_field_count(&self) -> usize {
        [&self.name, &self.title, &self.company, &self.date]
            .iter()
            .filter(|field| field.is_some())
            .count()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureLayout {
    Single,
    SideBySide,
}

/// A fully parsed signature block: the marker that introduced it, its
/// detected layout, and the ordered parties extracted from the context.
///
/// Invariant: `notary_required` is true exactly when the marker kind is
/// `Notary`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureBlockData {
    pub marker: SignatureMarker,
    pub layout: SignatureLayout,
    pub parties: Vec<SignatureParty>,
    pub notary_required: bool,
    /// Line span `[start, end)` of the source lines consumed as this
    /// block's context (marker line included). Used by the renderer to
    /// avoid emitting the same party lines twice.
    pub context_range: (usize, usize),
}

impl SignatureBlockData {
    /// The id prefix shared by related blocks, e.g. `assignor-signature`
    /// and `assignor-notary` both yield `assignor`.
    pub fn group_key(&self) -> &str {
        let id = self.marker.id.as_str();
        id.strip_suffix("-signature")
            .or_else(|| id.strip_suffix("-notary"))
            .unwrap_or(id)
    }
}

/// The outcome of signature parsing over a whole document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedDocument {
    pub content_lines: Vec<String>,
    pub signature_blocks: Vec<SignatureBlockData>,
    pub has_signatures: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Column geometry for rendering a signature block on a Letter page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ColumnLayout {
    pub columns: u32,
    pub column_width: f32,
    pub spacing: f32,
    pub alignment: Alignment,
}

/// Pagination policy for one signature block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BlockPlacement {
    pub prevent_break: bool,
    pub prefer_new_page: bool,
    pub min_space_required: f32,
}

/// Blocks whose marker ids share a prefix and should travel together
/// through pagination (a signature block and its notary acknowledgment).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureBlockGroup {
    pub key: String,
    pub block_ids: Vec<String>,
    pub total_height: f32,
}
