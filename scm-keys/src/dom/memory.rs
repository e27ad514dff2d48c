use super::{Document, DomEvent, ElementId, OverlayDisplay, Point, Pointer, Rect, Size};
use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::Mutex;
use regex::Regex;
use std::{
    collections::BTreeMap,
    sync::{Arc, LazyLock},
};
use tokio::sync::mpsc;

macro_rules! re {
    ($pat:expr) => {
        LazyLock::new(|| Regex::new($pat).unwrap())
    };
}

static RE_LINE_BREAK: LazyLock<Regex> = re!(r"(?i)<br\s*/?>|</?(?:div|p|li|tr)\b[^>]*>");
static RE_TAG: LazyLock<Regex> = re!(r"<[^>]*>");

/// Approximate glyph metrics used to size the overlay.
const CHAR_WIDTH: f64 = 7.0;
const LINE_HEIGHT: f64 = 16.0;
const PADDING: f64 = 12.0;

/// Shared, cloneable in-memory page.
///
/// Clones share one page: a test (or demo) plays the host page through the
/// `append`/`set_html`/`remove` methods while the synchronizer drives the
/// [`Document`] side. Mutations are reported on the event channel the way a
/// browser's mutation observers would.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    page: Arc<Mutex<Page>>,
    events: mpsc::UnboundedSender<DomEvent>,
}

#[derive(Debug)]
struct Page {
    next_id: u64,
    nodes: BTreeMap<ElementId, Node>,
    watched: FnvHashSet<ElementId>,
    overlays: FnvHashMap<String, OverlayNode>,
    viewport: Size,
}

#[derive(Debug, Clone)]
struct Node {
    classes: Vec<String>,
    html: String,
    displayed: bool,
    rect: Rect,
    annotation: Option<AnnotationNode>,
}

#[derive(Debug, Clone)]
struct AnnotationNode {
    marker: String,
    html: String,
    writes: usize,
}

/// Observable state of the floating overlay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayNode {
    pub html: String,
    pub display: OverlayDisplay,
    pub position: Point,
}

impl MemoryDocument {
    /// Default viewport of 1280x720.
    pub fn new(events: mpsc::UnboundedSender<DomEvent>) -> Self {
        Self {
            page: Arc::new(Mutex::new(Page {
                next_id: 1,
                nodes: BTreeMap::new(),
                watched: FnvHashSet::default(),
                overlays: FnvHashMap::default(),
                viewport: Size::new(1280.0, 720.0),
            })),
            events,
        }
    }

    /// Page plus the receiving end of its event channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DomEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn set_viewport(&self, viewport: Size) {
        self.page.lock().viewport = viewport;
    }

    /// Insert an element and report it to the structural watch.
    pub fn append(&self, classes: &[&str], html: &str) -> ElementId {
        let id = self.insert(classes, html);
        self.emit(DomEvent::NodesAdded(vec![id]));
        id
    }

    /// Insert an element without any mutation event, as if the host page's
    /// observer callback was missed.
    pub fn append_unobserved(&self, classes: &[&str], html: &str) -> ElementId {
        self.insert(classes, html)
    }

    /// Host re-render: replaces the element's markup, dropping injected children.
    pub fn set_html(&self, id: ElementId, html: &str) {
        let watched = {
            let mut page = self.page.lock();
            let Some(node) = page.nodes.get_mut(&id) else {
                return;
            };
            node.html = html.to_string();
            node.annotation = None;
            page.watched.contains(&id)
        };
        if watched {
            self.emit(DomEvent::ContentChanged(id));
        }
    }

    pub fn set_displayed(&self, id: ElementId, displayed: bool) {
        if let Some(node) = self.page.lock().nodes.get_mut(&id) {
            node.displayed = displayed;
        }
    }

    pub fn set_rect(&self, id: ElementId, rect: Rect) {
        if let Some(node) = self.page.lock().nodes.get_mut(&id) {
            node.rect = rect;
        }
    }

    pub fn remove(&self, id: ElementId) {
        let removed = {
            let mut page = self.page.lock();
            page.watched.remove(&id);
            page.nodes.remove(&id).is_some()
        };
        if removed {
            self.emit(DomEvent::NodeRemoved(id));
        }
    }

    /// Pointer entering or leaving the overlay.
    pub fn hover_overlay(&self, pointer: Pointer) {
        self.emit(DomEvent::OverlayPointer(pointer));
    }

    pub fn is_watched(&self, id: ElementId) -> bool {
        self.page.lock().watched.contains(&id)
    }

    /// Markup of the injected annotation block, if any.
    pub fn annotation_html(&self, id: ElementId) -> Option<String> {
        self.page
            .lock()
            .nodes
            .get(&id)?
            .annotation
            .as_ref()
            .map(|annotation| annotation.html.clone())
    }

    /// Number of times the current annotation block has been written.
    pub fn annotation_writes(&self, id: ElementId) -> usize {
        self.page
            .lock()
            .nodes
            .get(&id)
            .and_then(|node| node.annotation.as_ref())
            .map_or(0, |annotation| annotation.writes)
    }

    pub fn overlay(&self, overlay_id: &str) -> Option<OverlayNode> {
        self.page.lock().overlays.get(overlay_id).cloned()
    }

    fn insert(&self, classes: &[&str], html: &str) -> ElementId {
        let mut page = self.page.lock();
        let id = ElementId(page.next_id);
        page.next_id += 1;
        page.nodes.insert(
            id,
            Node {
                classes: classes.iter().map(|class| class.to_string()).collect(),
                html: html.to_string(),
                displayed: true,
                rect: Rect::default(),
                annotation: None,
            },
        );
        id
    }

    fn emit(&self, event: DomEvent) {
        // Nobody listening is fine: the page outlives its observers
        let _ = self.events.send(event);
    }
}

/// Approximation of `innerText` for simple tooltip markup.
fn render_text(html: &str) -> String {
    let broken = RE_LINE_BREAK.replace_all(html, "\n");
    RE_TAG
        .replace_all(&broken, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

impl Node {
    fn inner_html(&self) -> String {
        match &self.annotation {
            Some(annotation) => format!("{}{}", self.html, annotation.html),
            None => self.html.clone(),
        }
    }
}

impl Document for MemoryDocument {
    fn query_by_class(&self, classes: &[String]) -> Vec<ElementId> {
        self.page
            .lock()
            .nodes
            .iter()
            .filter(|(_, node)| node.classes.iter().any(|class| classes.contains(class)))
            .map(|(id, _)| *id)
            .collect()
    }

    fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.page
            .lock()
            .nodes
            .get(&id)
            .is_some_and(|node| node.classes.iter().any(|c| c == class))
    }

    fn contains(&self, id: ElementId) -> bool {
        self.page.lock().nodes.contains_key(&id)
    }

    fn text(&self, id: ElementId) -> Option<String> {
        self.page
            .lock()
            .nodes
            .get(&id)
            .map(|node| render_text(&node.inner_html()))
    }

    fn markup(&self, id: ElementId) -> Option<String> {
        self.page.lock().nodes.get(&id).map(Node::inner_html)
    }

    fn is_displayed(&self, id: ElementId) -> bool {
        self.page
            .lock()
            .nodes
            .get(&id)
            .is_some_and(|node| node.displayed)
    }

    fn bounding_rect(&self, id: ElementId) -> Option<Rect> {
        self.page.lock().nodes.get(&id).map(|node| node.rect)
    }

    fn viewport(&self) -> Size {
        self.page.lock().viewport
    }

    fn watch_content(&mut self, id: ElementId) {
        let mut page = self.page.lock();
        if page.nodes.contains_key(&id) {
            page.watched.insert(id);
        }
    }

    fn has_annotation(&self, id: ElementId, marker: &str) -> bool {
        self.page
            .lock()
            .nodes
            .get(&id)
            .and_then(|node| node.annotation.as_ref())
            .is_some_and(|annotation| annotation.marker == marker)
    }

    fn upsert_annotation(&mut self, id: ElementId, marker: &str, html: &str) {
        let watched = {
            let mut page = self.page.lock();
            let Some(node) = page.nodes.get_mut(&id) else {
                return;
            };
            let writes = node
                .annotation
                .as_ref()
                .filter(|annotation| annotation.marker == marker)
                .map_or(0, |annotation| annotation.writes);
            node.annotation = Some(AnnotationNode {
                marker: marker.to_string(),
                html: html.to_string(),
                writes: writes + 1,
            });
            page.watched.contains(&id)
        };
        // Writing into a watched element triggers its own watch, as in a browser
        if watched {
            self.emit(DomEvent::ContentChanged(id));
        }
    }

    fn ensure_overlay(&mut self, overlay_id: &str) {
        self.page
            .lock()
            .overlays
            .entry(overlay_id.to_string())
            .or_default();
    }

    fn set_overlay_content(&mut self, overlay_id: &str, html: &str) {
        if let Some(overlay) = self.page.lock().overlays.get_mut(overlay_id) {
            overlay.html = html.to_string();
        }
    }

    fn set_overlay_display(&mut self, overlay_id: &str, display: OverlayDisplay) {
        if let Some(overlay) = self.page.lock().overlays.get_mut(overlay_id) {
            overlay.display = display;
        }
    }

    fn overlay_size(&self, overlay_id: &str) -> Option<Size> {
        let page = self.page.lock();
        let overlay = page.overlays.get(overlay_id)?;
        if overlay.display == OverlayDisplay::Hidden {
            return Some(Size::default());
        }

        let text = render_text(&overlay.html);
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let widest = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);

        Some(Size::new(
            widest as f64 * CHAR_WIDTH + PADDING,
            lines.len() as f64 * LINE_HEIGHT + PADDING,
        ))
    }

    fn move_overlay(&mut self, overlay_id: &str, position: Point) {
        if let Some(overlay) = self.page.lock().overlays.get_mut(overlay_id) {
            overlay.position = position;
        }
    }
}
