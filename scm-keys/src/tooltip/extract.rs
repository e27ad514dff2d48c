use crate::series::day::parse_day;
use regex::Regex;
use std::{fmt::Debug, sync::LazyLock};

macro_rules! re {
    ($pat:expr) => {
        LazyLock::new(|| Regex::new($pat).unwrap())
    };
}

/// Currency symbols Steam renders next to an amount.
const SYMBOLS: &str = "$€£¥₽₴₩₹₺₪₸₫฿₱";

static RE_CURRENCY_MARKER: LazyLock<Regex> =
    re!(&format!(r"[{SYMBOLS}]|zł|pуб|руб|\bkr\b|\b[A-Z]{{3}}\b"));
static RE_MARKUP_DATE: LazyLock<Regex> = re!(r"\b([A-Z][a-z]{2})\s+(\d{1,2}),?\s+(\d{4})\b");
static RE_MARKUP_PRICE: LazyLock<Regex> = re!(&format!(r"\d[\d.,]*[{SYMBOLS}]"));

/// Upper-case words that look like currency codes but are time zones.
const NOT_CURRENCY_CODES: &[&str] = &["UTC", "GMT"];

/// Snapshot of a tooltip's rendered content.
#[derive(Debug, Copy, Clone)]
pub struct TooltipContent<'a> {
    /// Rendered text (`innerText`)
    pub text: &'a str,
    /// Raw inner markup (`innerHTML`)
    pub markup: &'a str,
}

/// Date and price fragments extracted from a tooltip, not yet parsed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TooltipObservation {
    pub date_line: String,
    pub price_line: String,
}

impl TooltipObservation {
    pub fn new(date_line: impl Into<String>, price_line: impl Into<String>) -> Self {
        Self {
            date_line: date_line.into(),
            price_line: price_line.into(),
        }
    }
}

/// One way of finding a (date, price) pair in a tooltip. Never panics; `None`
/// means "not recognised".
pub trait Extractor: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, content: &TooltipContent<'_>) -> Option<TooltipObservation>;
}

/// Line based extraction for the listing page's hover tooltips.
///
/// The date line is the first line that parses as a day; the price line is
/// the first other line with a digit and a currency marker.
#[derive(Debug, Default, Copy, Clone)]
pub struct LineExtractor;

impl Extractor for LineExtractor {
    fn name(&self) -> &'static str {
        "line"
    }

    fn extract(&self, content: &TooltipContent<'_>) -> Option<TooltipObservation> {
        let lines: Vec<&str> = content
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let (date_index, date_line) = lines
            .iter()
            .enumerate()
            .find(|(_, line)| parse_day(line).is_some())?;

        let price_line = lines
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != date_index)
            .map(|(_, line)| *line)
            .find(|line| is_price_line(line))?;

        Some(TooltipObservation::new(*date_line, price_line))
    }
}

fn is_price_line(line: &str) -> bool {
    line.chars().any(|c| c.is_ascii_digit())
        && RE_CURRENCY_MARKER
            .find_iter(line)
            .any(|marker| !NOT_CURRENCY_CODES.contains(&marker.as_str()))
}

/// Pattern based extraction for the price history chart's highlighter
/// tooltip, whose markup looks like `"Nov 30 2013 01: +0<br>2,49€<br>120 sold"`.
#[derive(Debug, Default, Copy, Clone)]
pub struct MarkupExtractor;

impl Extractor for MarkupExtractor {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn extract(&self, content: &TooltipContent<'_>) -> Option<TooltipObservation> {
        let date = RE_MARKUP_DATE.captures(content.markup)?;
        let price = RE_MARKUP_PRICE.find(content.markup)?;

        Some(TooltipObservation::new(
            format!("{} {} {}", &date[1], &date[2], &date[3]),
            price.as_str(),
        ))
    }
}

/// Ordered fallback list of [`Extractor`]s; the first hit wins.
#[derive(Debug)]
pub struct ExtractorChain {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorChain {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Append a strategy tried after the existing ones.
    pub fn with(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Hover tooltips: text lines first, markup patterns as a fallback.
    pub fn inline() -> Self {
        Self::new().with(LineExtractor).with(MarkupExtractor)
    }

    /// Chart tooltips: markup patterns first, text lines as a fallback.
    pub fn chart() -> Self {
        Self::new().with(MarkupExtractor).with(LineExtractor)
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// First observation any strategy produces, with the strategy's name.
    pub fn extract(&self, content: &TooltipContent<'_>) -> Option<(&'static str, TooltipObservation)> {
        self.extractors
            .iter()
            .find_map(|extractor| Some((extractor.name(), extractor.extract(content)?)))
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(text: &str) -> TooltipContent<'_> {
        TooltipContent { text, markup: "" }
    }

    fn markup(markup: &str) -> TooltipContent<'_> {
        TooltipContent { text: "", markup }
    }

    #[test]
    fn test_line_extractor() {
        struct TestCase {
            input: &'static str,
            expected: Option<TooltipObservation>,
        }

        let tests = vec![
            TestCase {
                // TC0: plain two line tooltip
                input: "Jan 1 2024\n$24.00",
                expected: Some(TooltipObservation::new("Jan 1 2024", "$24.00")),
            },
            TestCase {
                // TC1: blank lines, padding and a volume line
                input: "\n  Nov 30 2013 01: +0 \n\n 2,49€ \n 120 sold\n",
                expected: Some(TooltipObservation::new("Nov 30 2013 01: +0", "2,49€")),
            },
            TestCase {
                // TC2: date line not first, three letter currency code
                input: "Median sale price\nMar 5 2024 17:45 UTC\n3.10 USD",
                expected: Some(TooltipObservation::new("Mar 5 2024 17:45 UTC", "3.10 USD")),
            },
            TestCase {
                // TC3: number without a currency marker is not a price
                input: "Jan 1 2024\n120 sold",
                expected: None,
            },
            TestCase {
                // TC4: no date
                input: "Lowest price\n$24.00",
                expected: None,
            },
            TestCase {
                // TC5: injected annotation lines are ignored
                input: "Jan 1 2024\nKey median: 12.00\nValue: 2.00 keys\n$24.00",
                expected: Some(TooltipObservation::new("Jan 1 2024", "$24.00")),
            },
            TestCase {
                // TC6: złoty suffix
                input: "Jan 1 2024\n9,99zł",
                expected: Some(TooltipObservation::new("Jan 1 2024", "9,99zł")),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = LineExtractor.extract(&text(test.input));
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_markup_extractor() {
        struct TestCase {
            input: &'static str,
            expected: Option<TooltipObservation>,
        }

        let tests = vec![
            TestCase {
                // TC0: chart highlighter markup
                input: "Nov 30 2013 01: +0<br>2,49€<br>120 sold",
                expected: Some(TooltipObservation::new("Nov 30 2013", "2,49€")),
            },
            TestCase {
                // TC1: comma after the day, first price wins
                input: "<span>Jan 01, 2024</span><b>1.234,56€</b> (3,00€)",
                expected: Some(TooltipObservation::new("Jan 01 2024", "1.234,56€")),
            },
            TestCase {
                // TC2: symbol before the amount is not matched
                input: "Jan 1 2024<br>$24.00",
                expected: None,
            },
            TestCase {
                // TC3: no date
                input: "<br>2,49€",
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = MarkupExtractor.extract(&markup(test.input));
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_chain_falls_back_in_order() {
        let content = TooltipContent {
            text: "Jan 1 2024\n$24.00",
            markup: "Jan 1 2024<br>$24.00",
        };

        let (name, observation) = ExtractorChain::chart().extract(&content).unwrap();
        assert_eq!(name, "line");
        assert_eq!(observation, TooltipObservation::new("Jan 1 2024", "$24.00"));

        let content = TooltipContent {
            text: "Jan 1 2024 - 2,49€",
            markup: "Jan 1 2024 - 2,49€",
        };
        let (name, observation) = ExtractorChain::inline().extract(&content).unwrap();
        assert_eq!(name, "markup");
        assert_eq!(observation, TooltipObservation::new("Jan 1 2024", "2,49€"));

        assert!(ExtractorChain::new().extract(&content).is_none());
        assert_eq!(ExtractorChain::inline().len(), 2);
    }
}
