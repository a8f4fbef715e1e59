//! Extraction of bin-collection blocks from upstream HTML.
//!
//! Both council portals render one container per bin stream holding a bold
//! label, a list of upcoming dates, and an image of the bin. They differ only
//! in how the container is marked and how dates are written, which is what
//! [`BlockLayout`] and [`DateStyle`] capture.

use scraper::{ElementRef, Html, Selector};

use crate::date::{DateStyle, parse_collection_date};
use crate::model::{BinCategory, CollectionEntry, Schedule};
use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// CSS selectors locating the pieces of a bin block.
pub struct BlockLayout {
    /// Container of one bin stream.
    pub block: &'static str,
    /// Label naming the bin, searched inside the block.
    pub label: &'static str,
    /// Date list items; only the first is read.
    pub date_item: &'static str,
    /// Bin image; only the first is read.
    pub image: &'static str,
}

struct CompiledLayout {
    block: Selector,
    label: Selector,
    date_item: Selector,
    image: Selector,
}

impl BlockLayout {
    fn compile(&self) -> Result<CompiledLayout, PortError> {
        Ok(CompiledLayout {
            block: parse_selector(self.block)?,
            label: parse_selector(self.label)?,
            date_item: parse_selector(self.date_item)?,
            image: parse_selector(self.image)?,
        })
    }
}

/// Parse an HTML fragment or document into a [`Schedule`].
///
/// Blocks with an empty label, an empty date, an unknown category, or a date
/// that does not parse in `style` are skipped without failing the whole
/// extraction, so the result may be empty.
///
/// # Errors
///
/// Returns [`PortError::Parse`] if one of the layout selectors is invalid.
pub fn extract_blocks(
    html: &str,
    layout: &BlockLayout,
    style: DateStyle,
) -> Result<Schedule, PortError> {
    let selectors = layout.compile()?;
    let document = Html::parse_document(html);

    let mut schedule = Schedule::new();

    for block in document.select(&selectors.block) {
        let label_text = block
            .select(&selectors.label)
            .flat_map(|element| element.text())
            .collect::<String>();
        let label = label_text.trim();

        let raw_date = block
            .select(&selectors.date_item)
            .next()
            .map(element_text)
            .unwrap_or_default();

        if label.is_empty() || raw_date.is_empty() {
            tracing::debug!(label, raw_date = %raw_date, "skipping incomplete bin block");
            continue;
        }

        let Some(category) = BinCategory::classify(label) else {
            tracing::debug!(label, "skipping block with unrecognised bin label");
            continue;
        };

        let Some(date) = parse_collection_date(&raw_date, style) else {
            tracing::debug!(%category, raw_date = %raw_date, "skipping block with unparseable date");
            continue;
        };

        let image = block
            .select(&selectors.image)
            .next()
            .and_then(|element| element.value().attr("src"))
            .map(strip_whitespace);

        schedule.insert(CollectionEntry {
            category,
            date,
            image,
        });
    }

    Ok(schedule)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn strip_whitespace(src: &str) -> String {
    src.chars().filter(|ch| !ch.is_whitespace()).collect()
}

fn parse_selector(selector: &str) -> Result<Selector, PortError> {
    Selector::parse(selector)
        .map_err(|err| PortError::Parse(format!("invalid CSS selector '{selector}': {err}")))
}
