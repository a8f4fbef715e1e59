//! Domain data structures for councils, property references, and collection schedules.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Length of the collection window requested from upstreams that take one.
pub const COLLECTION_WINDOW_DAYS: i64 = 56;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Identifier for a council upstream known to binday.
pub struct CouncilId(pub String);

impl fmt::Display for CouncilId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for CouncilId {
    fn from(slug: &str) -> Self {
        CouncilId(slug.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Metadata describing a council upstream and its human-friendly name.
pub struct CouncilMeta {
    /// Unique identifier.
    pub id: CouncilId,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
/// Waste streams collected by the council.
pub enum BinCategory {
    /// General waste.
    Grey,
    /// Paper and card recycling.
    Beige,
    /// Plastics, cans, and glass.
    Burgundy,
    /// Garden waste.
    Green,
}

/// Keyword table used to classify block labels. Order matters: first hit wins.
const CATEGORY_KEYWORDS: [(&str, BinCategory); 7] = [
    ("grey", BinCategory::Grey),
    ("recycling", BinCategory::Beige),
    ("beige", BinCategory::Beige),
    ("plastic", BinCategory::Burgundy),
    ("burgundy", BinCategory::Burgundy),
    ("garden", BinCategory::Green),
    ("green", BinCategory::Green),
];

impl BinCategory {
    /// Classify a free-text label by case-sensitive substring match.
    ///
    /// Returns `None` for labels that mention none of the known streams.
    #[must_use]
    pub fn classify(label: &str) -> Option<Self> {
        CATEGORY_KEYWORDS
            .iter()
            .find(|(keyword, _category)| label.contains(keyword))
            .map(|&(_keyword, category)| category)
    }

    /// Lower-case key used in the public JSON response.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BinCategory::Grey => "grey",
            BinCategory::Beige => "beige",
            BinCategory::Burgundy => "burgundy",
            BinCategory::Green => "green",
        }
    }
}

impl fmt::Display for BinCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Next scheduled collection for one bin category.
///
/// The relative label ("tomorrow", "in 4 days") is computed from `date` at
/// render time, see [`crate::date::relative_label`].
pub struct CollectionEntry {
    /// Bin category collected.
    pub category: BinCategory,
    /// Date of the next collection.
    pub date: NaiveDate,
    /// Upstream image reference for the bin, if the block carried one.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Collection entries keyed by bin category, at most one per category.
pub struct Schedule {
    entries: BTreeMap<BinCategory, CollectionEntry>,
}

impl Schedule {
    /// Create an empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any earlier entry for the same category.
    pub fn insert(&mut self, entry: CollectionEntry) {
        self.entries.insert(entry.category, entry);
    }

    /// Look up the entry for a category.
    #[must_use]
    pub fn get(&self, category: BinCategory) -> Option<&CollectionEntry> {
        self.entries.get(&category)
    }

    /// Number of categories with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no block produced an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over entries in category order.
    pub fn entries(&self) -> impl Iterator<Item = &CollectionEntry> {
        self.entries.values()
    }
}

impl FromIterator<CollectionEntry> for Schedule {
    fn from_iter<I: IntoIterator<Item = CollectionEntry>>(iter: I) -> Self {
        let mut schedule = Schedule::new();
        for entry in iter {
            schedule.insert(entry);
        }
        schedule
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Inclusive start/end range for requested schedules.
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Collection window starting today and spanning [`COLLECTION_WINDOW_DAYS`].
    #[must_use]
    pub fn collection_window(today: NaiveDate) -> Self {
        Self {
            start: today,
            end: today + Duration::days(COLLECTION_WINDOW_DAYS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// How a property is identified to the upstream portal.
pub enum PropertyRef {
    /// Unique Property Reference Number.
    Uprn(String),
    /// Postcode plus the address option selected on the legacy form.
    PostcodeAddress {
        /// Postcode as typed by the user.
        postcode: String,
        /// Address selection value.
        address: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything an adapter needs to build its data request.
pub struct UpstreamQuery {
    /// Property being looked up.
    pub property: PropertyRef,
    /// Collection window; only sent by upstreams that accept one.
    pub window: DateRange,
}

impl UpstreamQuery {
    /// Build a query whose window starts on `today`.
    #[must_use]
    pub fn new(property: PropertyRef, today: NaiveDate) -> Self {
        Self {
            property,
            window: DateRange::collection_window(today),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Inbound parameters an adapter requires.
pub enum QueryKind {
    /// `uprn`
    Uprn,
    /// `postcode` and `address`
    PostcodeAddress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Bearer credential and CSRF token negotiated with a session-based portal.
pub struct SessionCredential {
    /// Value of the `Authorization` header handed out by the citizen endpoint.
    pub authorization: String,
    /// Anti-forgery token scraped from the portal page.
    pub csrf_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Hidden state fields a legacy web form expects back on postback.
pub struct FormState {
    /// `__VIEWSTATE`
    pub view_state: String,
    /// `__VIEWSTATEGENERATOR`
    pub view_state_generator: String,
    /// `__EVENTVALIDATION`
    pub event_validation: String,
    /// Session cookies set alongside the form, replayed on postback.
    pub cookie: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of negotiating with an upstream; consumed by exactly one data request.
pub enum Session {
    /// Upstream needs no negotiation.
    Anonymous,
    /// Authorization + CSRF pair.
    Credential(SessionCredential),
    /// Legacy form state.
    Form(FormState),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_first_matching_keyword() {
        assert_eq!(
            BinCategory::classify("Your grey bin"),
            Some(BinCategory::Grey)
        );
        assert_eq!(
            BinCategory::classify("Beige recycling bin"),
            Some(BinCategory::Beige)
        );
        assert_eq!(
            BinCategory::classify("burgundy bin for plastic"),
            Some(BinCategory::Burgundy)
        );
        assert_eq!(
            BinCategory::classify("green garden waste"),
            Some(BinCategory::Green)
        );
        // "grey" is checked before "green"
        assert_eq!(
            BinCategory::classify("grey and green"),
            Some(BinCategory::Grey)
        );
    }

    #[test]
    fn classify_is_case_sensitive_and_drops_unknown_labels() {
        assert_eq!(BinCategory::classify("Grey bin"), None);
        assert_eq!(BinCategory::classify("Food caddy"), None);
    }

    #[test]
    fn later_entries_replace_earlier_ones() {
        let first = NaiveDate::from_ymd_opt(2026, 1, 14).expect("valid date");
        let second = NaiveDate::from_ymd_opt(2026, 1, 21).expect("valid date");
        let schedule: Schedule = [first, second]
            .into_iter()
            .map(|date| CollectionEntry {
                category: BinCategory::Grey,
                date,
                image: None,
            })
            .collect();

        assert_eq!(schedule.len(), 1);
        assert_eq!(
            schedule.get(BinCategory::Grey).map(|entry| entry.date),
            Some(second)
        );
    }

    #[test]
    fn collection_window_spans_eight_weeks() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).expect("valid date");
        let window = DateRange::collection_window(today);
        assert_eq!(window.start, today);
        assert_eq!(
            window.end,
            NaiveDate::from_ymd_opt(2026, 3, 7).expect("valid date")
        );
    }
}
