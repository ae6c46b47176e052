use crate::model::{DocumentTree, NodeId, TreeNode};
use crate::surface::{SurfaceNodeId, SurfaceTree};

/// Produces or patches the surface so it shows the current tree.
///
/// Implementations must tag every surface node that renders a block or a span
/// with a back-reference to that model node (see [`SurfaceTree::bind`]).
pub trait Renderer {
    fn render(&mut self, tree: &DocumentTree, surface: &mut SurfaceTree);
}

/// Attribute carrying a styled span's format flags
pub const FLAGS_HINT: &str = "data-type";

/// Keyed renderer for the block/span document shape.
///
/// ```text
/// div.{prefix}-editor                 <- document root
///   div.{prefix}-block                <- block
///     div.{prefix}-block-content      <- untracked content container
///       "plain text"                  <- span without flags
///       span[data-type=1]             <- span with flags
///         "bold text"
///     div.{prefix}-block              <- nested block
/// ```
///
/// Existing surface nodes are reused by model id so a caret inside an
/// unchanged text node survives a render.
#[derive(Debug, Clone)]
pub struct BlockRenderer {
    class_prefix: String,
}

impl Default for BlockRenderer {
    fn default() -> Self {
        Self::new("blockweave")
    }
}

impl BlockRenderer {
    pub fn new(class_prefix: impl Into<String>) -> Self {
        Self {
            class_prefix: class_prefix.into(),
        }
    }

    pub fn class_prefix(&self) -> &str {
        &self.class_prefix
    }

    fn class(&self, suffix: &str) -> String {
        format!("{}-{suffix}", self.class_prefix)
    }

    /// Class of the element holding a block's spans
    pub fn content_class(&self) -> String {
        self.class("block-content")
    }

    fn element_for(&self, surface: &mut SurfaceTree, model: &NodeId, tag: &str) -> SurfaceNodeId {
        match surface.lookup(model).filter(|node| surface.tag(*node) == Some(tag)) {
            Some(existing) => existing,
            None => {
                let node = surface.create_element(tag);
                surface.bind(node, model.clone());
                node
            }
        }
    }

    fn render_block(
        &self,
        tree: &DocumentTree,
        surface: &mut SurfaceTree,
        block: &TreeNode,
    ) -> SurfaceNodeId {
        let element = self.element_for(surface, block.id(), "div");
        surface.set_attribute(element, "class", self.class("block"));
        if let Some(block_type) = block.as_element().and_then(|e| e.get_attribute("type")) {
            surface.set_attribute(element, "data-block-type", block_type);
        }

        let content_class = self.content_class();
        let existing_content = surface.children(element).first().copied().filter(|node| {
            surface.back_ref(*node).is_none()
                && surface.attribute(*node, "class") == Some(content_class.as_str())
        });
        let content = match existing_content {
            Some(node) => node,
            None => {
                let node = surface.create_element("div");
                surface.set_attribute(node, "class", content_class);
                node
            }
        };

        let spans: Vec<SurfaceNodeId> = tree
            .spans_of(block.id())
            .into_iter()
            .filter_map(|span| self.render_span(surface, span))
            .collect();
        surface.replace_children(content, &spans);

        let mut children = vec![content];
        for nested in tree.children(block.id()).filter(|node| node.is_block()) {
            children.push(self.render_block(tree, surface, nested));
        }
        surface.replace_children(element, &children);
        element
    }

    fn render_span(&self, surface: &mut SurfaceTree, node: &TreeNode) -> Option<SurfaceNodeId> {
        let span = node.as_span()?;
        let content = span.content();
        let existing = surface.lookup(node.id());

        if span.flags.is_empty() {
            if let Some(text) = existing.filter(|n| surface.is_text(*n)) {
                if surface.text(text) != Some(content.as_str()) {
                    surface.set_text(text, content);
                }
                return Some(text);
            }
            let text = surface.create_text(content);
            surface.bind(text, node.id().clone());
            return Some(text);
        }

        let element = self.element_for(surface, node.id(), "span");
        surface.set_attribute(element, FLAGS_HINT, span.flags.to_hint());
        let existing_text = surface
            .children(element)
            .iter()
            .copied()
            .find(|child| surface.is_text(*child));
        let text = match existing_text {
            Some(text) => {
                if surface.text(text) != Some(content.as_str()) {
                    surface.set_text(text, content);
                }
                text
            }
            None => surface.create_text(content),
        };
        surface.replace_children(element, &[text]);
        Some(element)
    }
}

impl Renderer for BlockRenderer {
    fn render(&mut self, tree: &DocumentTree, surface: &mut SurfaceTree) {
        let root_model = tree.root();
        let root = self.element_for(surface, root_model, "div");
        surface.set_attribute(root, "class", self.class("editor"));
        surface.set_root(root);

        let blocks: Vec<SurfaceNodeId> = tree
            .children(root_model)
            .filter(|node| node.is_block())
            .map(|block| self.render_block(tree, surface, block))
            .collect();
        surface.replace_children(root, &blocks);
        surface.retain_tracked(|model| tree.contains(model));
    }
}
