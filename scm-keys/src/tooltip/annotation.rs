use super::{
    extract::{ExtractorChain, TooltipContent},
    price::parse_price,
};
use crate::series::{
    day::{DayKey, parse_day},
    index::DayMedianTable,
};

/// Inline block styling, matching the listing page's tooltip palette.
const BLOCK_STYLE: &str =
    "margin-top:6px;padding-top:6px;border-top:1px solid #3a4b5c;color:#c7d5e0";

/// Last (day, price) pair successfully annotated on one tooltip.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnnotationState {
    pub day: DayKey,
    pub price: f64,
}

/// Item price expressed in keys for one day.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Annotation {
    pub day: DayKey,
    pub price: f64,
    pub key_median: f64,
    pub value: f64,
}

impl Annotation {
    pub fn state(&self) -> AnnotationState {
        AnnotationState {
            day: self.day,
            price: self.price,
        }
    }

    /// Block appended to a hover tooltip, carrying `marker` as its class.
    pub fn to_inline_html(&self, marker: &str) -> String {
        format!(
            "<div class=\"{marker}\" style=\"{BLOCK_STYLE}\">\
             <div>Key median: {:.2}</div>\
             <div><b>Value:</b> {:.2} keys</div>\
             </div>",
            self.key_median, self.value
        )
    }

    /// Content of the floating overlay.
    pub fn to_overlay_html(&self, marker: &str) -> String {
        format!(
            "<div class=\"{marker}\">\
             <div>{}</div>\
             <div>Key median: {:.2}</div>\
             <div><b>Value:</b> {:.2} keys</div>\
             </div>",
            self.day, self.key_median, self.value
        )
    }
}

/// Why a refresh pass rendered nothing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    IndexUnavailable,
    NoObservation,
    InvalidPrice,
    InvalidDate,
    NoMedian,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderAction {
    /// Write (or replace) the annotation
    Render(Annotation),
    /// Same (day, price) as the annotation already displayed
    Unchanged,
    /// Leave whatever is displayed untouched
    Skip(SkipReason),
}

/// Outcome of one refresh pass: the state to keep and what to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub state: Option<AnnotationState>,
    pub action: RenderAction,
}

impl Plan {
    fn skip(previous: Option<AnnotationState>, reason: SkipReason) -> Self {
        Self {
            state: previous,
            action: RenderAction::Skip(reason),
        }
    }
}

/// Decide what a tooltip should display given its current content.
///
/// Pure: depends only on the content, the extractors, the table and the
/// previously displayed state. A failed pass never clears `previous`, since
/// the host may be halfway through re-rendering the tooltip.
pub fn plan(
    content: &TooltipContent<'_>,
    extractors: &ExtractorChain,
    table: Option<&DayMedianTable>,
    previous: Option<AnnotationState>,
) -> Plan {
    let Some(table) = table else {
        return Plan::skip(previous, SkipReason::IndexUnavailable);
    };
    let Some((_, observation)) = extractors.extract(content) else {
        return Plan::skip(previous, SkipReason::NoObservation);
    };

    let price = match parse_price(&observation.price_line) {
        Some(price) if price.is_finite() && price != 0.0 => price,
        _ => return Plan::skip(previous, SkipReason::InvalidPrice),
    };
    let Some(day) = parse_day(&observation.date_line) else {
        return Plan::skip(previous, SkipReason::InvalidDate);
    };
    let key_median = match table.get(&day) {
        Some(median) if median.is_finite() && median > 0.0 => median,
        _ => return Plan::skip(previous, SkipReason::NoMedian),
    };

    let state = AnnotationState { day, price };
    if previous == Some(state) {
        return Plan {
            state: previous,
            action: RenderAction::Unchanged,
        };
    }

    Plan {
        state: Some(state),
        action: RenderAction::Render(Annotation {
            day,
            price,
            key_median,
            value: price / key_median,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::RawSample;

    fn table() -> DayMedianTable {
        DayMedianTable::build(vec![
            RawSample::new("Jan 1 2024", 10.0),
            RawSample::new("Jan 1 2024", 12.0),
            RawSample::new("Jan 2 2024", 20.0),
        ])
    }

    fn content(text: &str) -> TooltipContent<'_> {
        TooltipContent { text, markup: text }
    }

    #[test]
    fn test_plan_end_to_end_scenario() {
        let table = table();
        let plan = plan(
            &content("Jan 1 2024\n$24.00"),
            &ExtractorChain::inline(),
            Some(&table),
            None,
        );

        let RenderAction::Render(annotation) = plan.action else {
            panic!("expected a render, got {:?}", plan.action);
        };
        assert_eq!(annotation.key_median, 12.0);
        assert_eq!(annotation.price, 24.0);
        assert!((annotation.value - 2.0).abs() < 1e-9);
        assert_eq!(plan.state, Some(annotation.state()));

        let html = annotation.to_inline_html("scm-keys-annotation");
        assert!(html.starts_with("<div class=\"scm-keys-annotation\""));
        assert!(html.contains("<div>Key median: 12.00</div>"));
        assert!(html.contains("<div><b>Value:</b> 2.00 keys</div>"));
    }

    #[test]
    fn test_plan_is_idempotent() {
        let table = table();
        let chain = ExtractorChain::inline();
        let tooltip = content("Jan 1 2024\n$24.00");

        let first = plan(&tooltip, &chain, Some(&table), None);
        let second = plan(&tooltip, &chain, Some(&table), first.state);

        assert_eq!(second.action, RenderAction::Unchanged);
        assert_eq!(second.state, first.state);

        // A new price on the same day renders again
        let third = plan(&content("Jan 1 2024\n$36.00"), &chain, Some(&table), second.state);
        assert!(matches!(third.action, RenderAction::Render(a) if (a.value - 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_plan_skips_keep_previous_state() {
        struct TestCase {
            input: &'static str,
            table: Option<DayMedianTable>,
            expected: SkipReason,
        }

        let tests = vec![
            TestCase {
                // TC0: index never loaded
                input: "Jan 1 2024\n$24.00",
                table: None,
                expected: SkipReason::IndexUnavailable,
            },
            TestCase {
                // TC1: mid render, price not there yet
                input: "Jan 1 2024",
                table: Some(table()),
                expected: SkipReason::NoObservation,
            },
            TestCase {
                // TC2: zero price
                input: "Jan 1 2024\n$0.00",
                table: Some(table()),
                expected: SkipReason::InvalidPrice,
            },
            TestCase {
                // TC3: day missing from the series
                input: "Jan 3 2024\n$24.00",
                table: Some(table()),
                expected: SkipReason::NoMedian,
            },
            TestCase {
                // TC4: empty series
                input: "Jan 1 2024\n$24.00",
                table: Some(DayMedianTable::default()),
                expected: SkipReason::NoMedian,
            },
        ];

        let previous = Some(AnnotationState {
            day: parse_day("Jan 2 2024").unwrap(),
            price: 40.0,
        });

        for (index, test) in tests.into_iter().enumerate() {
            let actual = plan(
                &content(test.input),
                &ExtractorChain::inline(),
                test.table.as_ref(),
                previous,
            );
            assert_eq!(actual.action, RenderAction::Skip(test.expected), "TC{} failed", index);
            assert_eq!(actual.state, previous, "TC{} failed", index);
        }
    }

    #[test]
    fn test_plan_rejects_unparseable_date_from_custom_chain() {
        use crate::tooltip::extract::{Extractor, TooltipObservation};

        #[derive(Debug)]
        struct Fixed;

        impl Extractor for Fixed {
            fn name(&self) -> &'static str {
                "fixed"
            }

            fn extract(&self, _: &TooltipContent<'_>) -> Option<TooltipObservation> {
                Some(TooltipObservation::new("yesterday", "$5.00"))
            }
        }

        let table = table();
        let actual = plan(
            &content(""),
            &ExtractorChain::new().with(Fixed),
            Some(&table),
            None,
        );
        assert_eq!(actual.action, RenderAction::Skip(SkipReason::InvalidDate));
        assert_eq!(actual.state, None);
    }

    #[test]
    fn test_overlay_html_includes_day() {
        let annotation = Annotation {
            day: parse_day("Jan 2 2024").unwrap(),
            price: 30.0,
            key_median: 20.0,
            value: 1.5,
        };
        let html = annotation.to_overlay_html("marker");
        assert!(html.contains("<div>2024-01-02</div>"));
        assert!(html.contains("1.50 keys"));
    }
}
