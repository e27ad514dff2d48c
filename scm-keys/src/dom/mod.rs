//! Host page seam.
//!
//! The page that renders the tooltips is owned and mutated by someone else.
//! [`Document`] is the narrow surface the synchronizer reads and writes, and
//! [`DomEvent`] is what the page's mutation watches report back.

use derive_more::{Constructor, Display, From};

/// In-memory page used by the demo and the tests.
pub mod memory;

pub use memory::MemoryDocument;

/// Opaque handle to an element of the host page.
#[derive(Debug, Display, From, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ElementId(pub u64);

/// Screen-space box in CSS pixels.
#[derive(Debug, Constructor, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }
}

#[derive(Debug, Constructor, Copy, Clone, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Constructor, Copy, Clone, Default, PartialEq)]
pub struct Point {
    pub left: f64,
    pub top: f64,
}

/// Display mode of the floating overlay.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum OverlayDisplay {
    /// Not rendered at all
    #[default]
    Hidden,
    /// Laid out but invisible, so it can be measured
    Measuring,
    Visible,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Pointer {
    Enter,
    Leave,
}

/// Change notifications produced by the host page's watches.
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    /// Structural watch: elements (including descendants) added to the page
    NodesAdded(Vec<ElementId>),
    /// Content watch on an element registered via [`Document::watch_content`]
    ContentChanged(ElementId),
    NodeRemoved(ElementId),
    /// Pointer entering or leaving the floating overlay
    OverlayPointer(Pointer),
}

/// Read/write surface of the host page.
///
/// Reads on an element that left the page return `None`/`false`; writes on
/// it are ignored.
pub trait Document {
    /// Elements carrying any of `classes`, in document order.
    fn query_by_class(&self, classes: &[String]) -> Vec<ElementId>;

    fn has_class(&self, id: ElementId, class: &str) -> bool;

    fn contains(&self, id: ElementId) -> bool;

    /// Rendered text (`innerText`), including any injected annotation.
    fn text(&self, id: ElementId) -> Option<String>;

    /// Raw inner markup (`innerHTML`).
    fn markup(&self, id: ElementId) -> Option<String>;

    /// Whether the element's own display state is visible.
    fn is_displayed(&self, id: ElementId) -> bool;

    fn bounding_rect(&self, id: ElementId) -> Option<Rect>;

    fn viewport(&self) -> Size;

    /// Start reporting [`DomEvent::ContentChanged`] for `id`.
    fn watch_content(&mut self, id: ElementId);

    /// Whether `id` has a child block carrying `marker`.
    fn has_annotation(&self, id: ElementId, marker: &str) -> bool;

    /// Replace the child block carrying `marker` with `html`, or append one.
    fn upsert_annotation(&mut self, id: ElementId, marker: &str, html: &str);

    /// Create the overlay with `overlay_id` unless it already exists.
    fn ensure_overlay(&mut self, overlay_id: &str);

    fn set_overlay_content(&mut self, overlay_id: &str, html: &str);

    fn set_overlay_display(&mut self, overlay_id: &str, display: OverlayDisplay);

    /// Rendered size; only meaningful while measuring or visible.
    fn overlay_size(&self, overlay_id: &str) -> Option<Size>;

    fn move_overlay(&mut self, overlay_id: &str, position: Point);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.bottom(), 60.0);
        assert_eq!(rect.center_x(), 60.0);
    }

    #[test]
    fn test_element_id_display() {
        assert_eq!(ElementId::from(7).to_string(), "7");
    }
}
