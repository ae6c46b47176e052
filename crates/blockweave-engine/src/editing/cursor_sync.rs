//! Two-way mapping between the model cursor and the surface selection.

use crate::model::{CursorState, DocumentTree, NodeId};
use crate::surface::{floor_char_boundary, SurfaceNodeId, SurfacePoint, SurfaceTree};

/// Cursor described by the surface selection.
///
/// `None` means the selection should be ignored: there is none, or its start
/// (or the end of a range) lies outside any model node.
pub fn cursor_from_surface(tree: &DocumentTree, surface: &SurfaceTree) -> Option<CursorState> {
    let range = surface.selection()?;
    let start = resolve(tree, surface, range.start)?;
    if range.is_collapsed() {
        return Some(CursorState::Collapsed {
            target_id: start,
            offset: range.start.offset,
        });
    }
    let end = resolve(tree, surface, range.end)?;
    Some(CursorState::Open {
        start_id: start,
        start_offset: range.start.offset,
        end_id: end,
        end_offset: range.end.offset,
    })
}

fn resolve(tree: &DocumentTree, surface: &SurfaceTree, point: SurfacePoint) -> Option<NodeId> {
    surface
        .owner_of(point.node)
        .filter(|id| tree.contains(id))
        .cloned()
}

/// Move the surface selection to follow a cursor change from `old` to `new`.
///
/// Open ranges are left alone; a target without a surface node is logged
/// and skipped.
pub fn sync_surface_selection(surface: &mut SurfaceTree, new: &CursorState, old: &CursorState) {
    if new == old {
        return;
    }
    match new {
        CursorState::Undefined => surface.clear_selection(),
        CursorState::Open { .. } => {}
        CursorState::Collapsed { target_id, offset } => {
            let Some(node) = surface.lookup(target_id) else {
                log::warn!("cursor target {target_id} has no surface node");
                return;
            };
            let text = caret_text_node(surface, node);
            let offset = floor_char_boundary(surface.text(text).unwrap_or_default(), *offset);
            surface.set_caret(text, offset);
        }
    }
}

/// The text node a caret inside `node` lands in, created empty when an
/// element has none
fn caret_text_node(surface: &mut SurfaceTree, node: SurfaceNodeId) -> SurfaceNodeId {
    if surface.is_text(node) {
        return node;
    }
    let existing = surface
        .children(node)
        .iter()
        .copied()
        .find(|child| surface.is_text(*child));
    match existing {
        Some(text) => text,
        None => {
            let text = surface.create_text("");
            surface.append_child(node, text);
            text
        }
    }
}
