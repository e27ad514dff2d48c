use super::{
    annotation::{AnnotationState, RenderAction, plan},
    extract::{ExtractorChain, TooltipContent},
};
use crate::{
    config::KeysConfig,
    dom::{Document, ElementId, OverlayDisplay, Point, Pointer, Rect, Size},
    series::index::DayMedianTable,
};
use tracing::debug;

/// Where to put an `overlay` sized box next to the `anchor` tooltip.
///
/// Horizontally centred on the anchor and clamped into the viewport. Placed
/// above the anchor unless that would cross the top margin, in which case it
/// goes below, clamped to the bottom margin.
pub fn place_overlay(anchor: Rect, overlay: Size, viewport: Size, margin: f64) -> Point {
    let left = clamp_span(
        anchor.center_x() - overlay.width / 2.0,
        margin,
        viewport.width - overlay.width - margin,
    );

    let above = anchor.top - overlay.height - margin;
    let top = if above < margin {
        (anchor.bottom() + margin).min(viewport.height - overlay.height - margin)
    } else {
        above
    };

    Point::new(left, top)
}

/// Lower bound wins when the span is inverted (overlay wider than viewport).
fn clamp_span(value: f64, low: f64, high: f64) -> f64 {
    value.min(high).max(low)
}

/// Singleton floating overlay that follows the chart's highlighter tooltip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayState {
    /// Pointer is over the overlay: never hide it
    pub hover_locked: bool,
    shown: bool,
    content: Option<String>,
    annotated: Option<AnnotationState>,
    tracked: Option<ElementId>,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn tracked(&self) -> Option<ElementId> {
        self.tracked
    }

    pub fn pointer(&mut self, pointer: Pointer) {
        self.hover_locked = pointer == Pointer::Enter;
    }

    /// One tracking tick: follow the visible chart tooltip, or hide.
    pub fn poll<D>(
        &mut self,
        document: &mut D,
        config: &KeysConfig,
        extractors: &ExtractorChain,
        table: Option<&DayMedianTable>,
    ) where
        D: Document,
    {
        let visible = document
            .query_by_class(&config.chart_classes)
            .into_iter()
            .find(|id| document.is_displayed(*id));

        let Some(tooltip) = visible else {
            self.hide(document, config);
            return;
        };

        if self.tracked != Some(tooltip) {
            debug!(%tooltip, "Overlay tracking chart tooltip");
            self.tracked = Some(tooltip);
            self.annotated = None;
        }

        self.refresh(document, config, extractors, table, tooltip);

        if self.content.is_none() {
            self.hide(document, config);
            return;
        }
        let Some(anchor) = document.bounding_rect(tooltip) else {
            return;
        };

        if !self.shown {
            document.set_overlay_display(&config.overlay_id, OverlayDisplay::Measuring);
        }
        let size = document
            .overlay_size(&config.overlay_id)
            .unwrap_or_default();
        let position = place_overlay(anchor, size, document.viewport(), config.overlay_margin);

        document.move_overlay(&config.overlay_id, position);
        document.set_overlay_display(&config.overlay_id, OverlayDisplay::Visible);
        self.shown = true;
    }

    /// Recompute content from the tooltip's markup; a failed pass keeps
    /// whatever was displayed last.
    fn refresh<D>(
        &mut self,
        document: &mut D,
        config: &KeysConfig,
        extractors: &ExtractorChain,
        table: Option<&DayMedianTable>,
        tooltip: ElementId,
    ) where
        D: Document,
    {
        let (Some(text), Some(markup)) = (document.text(tooltip), document.markup(tooltip)) else {
            return;
        };
        let content = TooltipContent {
            text: &text,
            markup: &markup,
        };

        let plan = plan(&content, extractors, table, self.annotated);
        self.annotated = plan.state;

        let RenderAction::Render(annotation) = plan.action else {
            return;
        };
        let html = annotation.to_overlay_html(&config.annotation_marker);
        if self.content.as_deref() != Some(html.as_str()) {
            document.ensure_overlay(&config.overlay_id);
            document.set_overlay_content(&config.overlay_id, &html);
            self.content = Some(html);
        }
    }

    fn hide<D>(&mut self, document: &mut D, config: &KeysConfig)
    where
        D: Document,
    {
        if self.hover_locked || !self.shown {
            return;
        }
        document.set_overlay_display(&config.overlay_id, OverlayDisplay::Hidden);
        self.shown = false;
    }
}
