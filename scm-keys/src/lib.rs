/// SCM Keys - Steam Community Market tooltip annotator
///
/// Rewrites the prices shown in market tooltips into Mann Co. Supply Crate
/// Keys, using the key's median sale price for the same day:
/// - series: fetch the key price history and build a day -> median table
/// - tooltip: extract (date, price) from a tooltip and plan its annotation
/// - sync: keep every tooltip on the page annotated as it changes
/// - runtime: load the index once, then drive the synchronizer from page
///   events and timers
///
/// The host page is abstracted behind [`dom::Document`]; [`dom::MemoryDocument`]
/// is an in-memory implementation for demos and tests.
pub mod config;

/// Crate wide error type.
pub mod error;

pub mod series;

pub mod tooltip;

pub mod dom;

/// Per-page tooltip synchronizer.
pub mod sync;

/// Event loop tying the index load, page events and timers together.
pub mod runtime;

// Re-export commonly used types for convenience
pub use config::{DEFAULT_PRICE_HISTORY_URL, KeysConfig};
pub use error::KeyError;

pub use series::{
    RawSample, ReferenceSeries, TimestampRaw,
    day::{DayKey, parse_day},
    fetch::{HttpSeriesFetcher, SeriesFetcher},
    index::{DayMedianTable, ReferenceIndex},
};

pub use tooltip::{
    Annotation, AnnotationState, ExtractorChain, OverlayState, RenderAction, SkipReason,
    TooltipContent, place_overlay, plan, price::parse_price,
};

pub use dom::{Document, DomEvent, ElementId, MemoryDocument, Pointer};

pub use runtime::KeysRuntime;
pub use sync::TooltipSynchronizer;
