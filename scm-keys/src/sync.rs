use crate::{
    config::KeysConfig,
    dom::{Document, DomEvent, ElementId},
    series::index::ReferenceIndex,
    tooltip::{
        annotation::{AnnotationState, RenderAction, plan},
        extract::{ExtractorChain, TooltipContent},
        overlay::OverlayState,
    },
};
use fnv::{FnvHashMap, FnvHashSet};
use tracing::{debug, trace};

/// Keeps every tooltip on the page annotated with its price in keys.
///
/// Owns all mutable state of the annotator: the per-element
/// [`AnnotationState`]s, the singleton [`OverlayState`] and a handle to the
/// shared [`ReferenceIndex`]. Every entry point is synchronous.
#[derive(Debug)]
pub struct TooltipSynchronizer<D> {
    document: D,
    index: ReferenceIndex,
    config: KeysConfig,
    inline: ExtractorChain,
    chart: ExtractorChain,
    /// Observed inline tooltips and what was last annotated on each
    tracked: FnvHashMap<ElementId, Option<AnnotationState>>,
    overlay: OverlayState,
}

impl<D> TooltipSynchronizer<D>
where
    D: Document,
{
    pub fn new(document: D, index: ReferenceIndex, config: KeysConfig) -> Self {
        Self {
            document,
            index,
            config,
            inline: ExtractorChain::inline(),
            chart: ExtractorChain::chart(),
            tracked: FnvHashMap::default(),
            overlay: OverlayState::new(),
        }
    }

    /// Replace the default extraction strategies.
    pub fn with_extractors(mut self, inline: ExtractorChain, chart: ExtractorChain) -> Self {
        self.inline = inline;
        self.chart = chart;
        self
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn is_tracked(&self, id: ElementId) -> bool {
        self.tracked.contains_key(&id)
    }

    pub fn annotation_state(&self, id: ElementId) -> Option<AnnotationState> {
        self.tracked.get(&id).copied().flatten()
    }

    pub fn handle_event(&mut self, event: DomEvent) {
        match event {
            DomEvent::NodesAdded(ids) => {
                for id in ids {
                    if self.is_inline_tooltip(id) {
                        self.observe(id);
                    }
                }
            }
            DomEvent::ContentChanged(id) => {
                if self.is_tracked(id) {
                    self.refresh(id);
                }
            }
            DomEvent::NodeRemoved(id) => {
                if self.tracked.remove(&id).is_some() {
                    debug!(%id, "Tooltip left the page");
                }
            }
            DomEvent::OverlayPointer(pointer) => self.overlay.pointer(pointer),
        }
    }

    /// Full document scan: observes tooltips the structural watch missed,
    /// refreshes the known ones and forgets those no longer on the page.
    pub fn rescan(&mut self) {
        let found = self.document.query_by_class(&self.config.inline_classes);

        let present: FnvHashSet<ElementId> = found.iter().copied().collect();
        self.tracked.retain(|id, _| present.contains(id));

        for id in found {
            self.observe(id);
        }
    }

    /// One overlay tracking tick.
    pub fn poll_overlay(&mut self) {
        let table = self.index.snapshot();
        self.overlay.poll(
            &mut self.document,
            &self.config,
            &self.chart,
            table.as_deref(),
        );
    }

    fn is_inline_tooltip(&self, id: ElementId) -> bool {
        self.config
            .inline_classes
            .iter()
            .any(|class| self.document.has_class(id, class))
    }

    fn observe(&mut self, id: ElementId) {
        if !self.tracked.contains_key(&id) {
            debug!(%id, "Observing tooltip");
            self.tracked.insert(id, None);
            self.document.watch_content(id);
        }
        self.refresh(id);
    }

    fn refresh(&mut self, id: ElementId) {
        let (Some(text), Some(markup)) = (self.document.text(id), self.document.markup(id)) else {
            return;
        };
        let content = TooltipContent {
            text: &text,
            markup: &markup,
        };

        // The previous state only counts while its block is still displayed
        let marker = &self.config.annotation_marker;
        let previous = self
            .annotation_state(id)
            .filter(|_| self.document.has_annotation(id, marker));

        let table = self.index.snapshot();
        let plan = plan(&content, &self.inline, table.as_deref(), previous);

        match plan.action {
            RenderAction::Render(annotation) => {
                debug!(
                    %id,
                    day = %annotation.day,
                    price = annotation.price,
                    value = annotation.value,
                    "Annotating tooltip"
                );
                // Record first: the write may echo back as a content change
                self.tracked.insert(id, plan.state);
                let html = annotation.to_inline_html(marker);
                self.document.upsert_annotation(id, marker, &html);
            }
            RenderAction::Unchanged => {}
            RenderAction::Skip(reason) => {
                trace!(%id, ?reason, "Tooltip skipped");
                self.tracked.insert(id, plan.state);
            }
        }
    }
}
