//! Everything that turns a tooltip's rendered content into a key valuation:
//! price parsing, (date, price) extraction strategies, the pure render
//! planner and the floating overlay.

/// Best-effort price parsing.
pub mod price;

/// Pluggable (date, price) extraction strategies.
pub mod extract;

/// Pure planner deciding what a tooltip should display.
pub mod annotation;

/// Floating overlay tracking the chart tooltip.
pub mod overlay;

pub use annotation::{Annotation, AnnotationState, Plan, RenderAction, SkipReason, plan};
pub use extract::{ExtractorChain, TooltipContent, TooltipObservation};
pub use overlay::{OverlayState, place_overlay};
