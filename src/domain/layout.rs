// Layout domain models
// Typed blocks consumed by the pagination engine and the renderer

use serde::{Deserialize, Serialize};

use crate::domain::signature::SignatureBlockData;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Text,
    Heading,
    ListItem,
    Blockquote,
    Table,
    HorizontalRule,
    Signature,
}

/// Block payload: plain text for most block types, structured signing
/// metadata for signature blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BlockContent {
    Text(String),
    Signature(SignatureBlockData),
}

impl BlockContent {
    pub fn as_text(&self) -> &str {
        match self {
            BlockContent::Text(text) => text,
            BlockContent::Signature(_) => "",
        }
    }
}

/// One measurable unit of document content.
///
/// Invariant: signature blocks are never breakable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutBlock {
    pub block_type: BlockType,
    pub content: BlockContent,
    pub estimated_height: f32,
    pub breakable: bool,
    pub keep_with_next: bool,
    pub heading_level: Option<u8>,
}

impl LayoutBlock {
    pub fn text(content: impl Into<String>, estimated_height: f32) -> Self {
        Self {
            block_type: BlockType::Text,
            content: BlockContent::Text(content.into()),
            estimated_height,
            breakable: true,
            keep_with_next: false,
            heading_level: None,
        }
    }

    pub fn heading(content: impl Into<String>, level: u8, estimated_height: f32) -> Self {
        Self {
            block_type: BlockType::Heading,
            content: BlockContent::Text(content.into()),
            estimated_height,
            breakable: false,
            // A heading stranded at the bottom of a page reads as an orphan,
            // so it always travels with the block that follows it.
            keep_with_next: true,
            heading_level: Some(level),
        }
    }

    pub fn list_item(content: impl Into<String>, estimated_height: f32) -> Self {
        Self {
            block_type: BlockType::ListItem,
            content: BlockContent::Text(content.into()),
            estimated_height,
            breakable: true,
            keep_with_next: false,
            heading_level: None,
        }
    }

    pub fn blockquote(content: impl Into<String>, estimated_height: f32) -> Self {
        Self {
            block_type: BlockType::Blockquote,
            content: BlockContent::Text(content.into()),
            estimated_height,
            breakable: true,
            keep_with_next: false,
            heading_level: None,
        }
    }

    pub fn horizontal_rule(estimated_height: f32) -> Self {
        Self {
            block_type: BlockType::HorizontalRule,
            content: BlockContent::Text(String::new()),
            estimated_height,
            breakable: false,
            keep_with_next: false,
            heading_level: None,
        }
    }

    pub fn signature(data: SignatureBlockData, estimated_height: f32) -> Self {
        Self {
            block_type: BlockType::Signature,
            content: BlockContent::Signature(data),
            estimated_height,
            breakable: false,
            keep_with_next: false,
            heading_level: None,
        }
    }
}

/// One output page: its assigned blocks and the vertical space left over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutPage {
    pub blocks: Vec<LayoutBlock>,
    pub remaining_height: f32,
    pub page_number: usize,
}

impl LayoutPage {
    pub fn new(page_number: usize, usable_height: f32) -> Self {
        Self {
            blocks: Vec::new(),
            remaining_height: usable_height,
            page_number,
        }
    }

    pub fn push(&mut self, block: LayoutBlock) {
        self.remaining_height = (self.remaining_height - block.estimated_height).max(0.0);
        self.blocks.push(block);
    }

    pub fn used_height(&self) -> f32 {
        self.blocks.iter().map(|b| b.estimated_height).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutResult {
    pub pages: Vec<LayoutPage>,
    pub total_pages: usize,
    pub has_overflow: bool,
}
