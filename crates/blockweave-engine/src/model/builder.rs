use crate::error::Result;
use crate::model::{DocumentTree, FormatFlags, NodeId, SpanData};

/// Direct construction of a document for the initial load.
///
/// ```rust
/// # use blockweave_engine::model::{DocumentBuilder, FormatFlags};
/// let tree = DocumentBuilder::new("doc")
///     .block("b1", [("s1", "Hello ", FormatFlags::empty()), ("s2", "world", FormatFlags::BOLD)])
///     .block("b2", [("s3", "second line", FormatFlags::empty())])
///     .build()
///     .unwrap();
/// assert_eq!(tree.text_of(&"b1".into()), "Hello world");
/// ```
#[derive(Debug)]
pub struct DocumentBuilder {
    root: NodeId,
    blocks: Vec<PendingBlock>,
}

#[derive(Debug)]
struct PendingBlock {
    parent: Option<NodeId>,
    id: NodeId,
    block_type: String,
    spans: Vec<SpanData>,
}

impl DocumentBuilder {
    pub fn new(root_id: impl Into<NodeId>) -> Self {
        Self {
            root: root_id.into(),
            blocks: Vec::new(),
        }
    }

    /// Append a top-level text block
    pub fn block<'a>(
        self,
        id: impl Into<NodeId>,
        spans: impl IntoIterator<Item = (&'a str, &'a str, FormatFlags)>,
    ) -> Self {
        self.push(None, id.into(), "text", spans)
    }

    /// Append a text block nested under an already declared block
    pub fn nested_block<'a>(
        self,
        parent: impl Into<NodeId>,
        id: impl Into<NodeId>,
        spans: impl IntoIterator<Item = (&'a str, &'a str, FormatFlags)>,
    ) -> Self {
        self.push(Some(parent.into()), id.into(), "text", spans)
    }

    fn push<'a>(
        mut self,
        parent: Option<NodeId>,
        id: NodeId,
        block_type: &str,
        spans: impl IntoIterator<Item = (&'a str, &'a str, FormatFlags)>,
    ) -> Self {
        let spans = spans
            .into_iter()
            .map(|(span_id, content, flags)| SpanData::new(span_id, content, flags))
            .collect();
        self.blocks.push(PendingBlock {
            parent,
            id,
            block_type: block_type.to_string(),
            spans,
        });
        self
    }

    pub fn build(self) -> Result<DocumentTree> {
        let mut tree = DocumentTree::new(self.root.clone());
        for block in self.blocks {
            let parent = block.parent.unwrap_or_else(|| self.root.clone());
            let last = tree.children(&parent).last().map(|n| n.id().clone());
            tree.insert_block(&parent, last.as_ref(), &block.id, &block.block_type, &block.spans)?;
        }
        Ok(tree)
    }
}
