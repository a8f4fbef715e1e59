//! Public response shapes and the step that builds them from a schedule.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::date::{format_display_date, relative_label};
use crate::model::{BinCategory, CollectionEntry, Schedule};
use crate::ports::PortError;

const STATE_OK: &str = "ok";
const STATE_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One bin as rendered to clients.
pub struct BinView {
    /// Collection date as `DD/MM/YYYY`.
    pub date: String,
    /// Upstream image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Label such as `tomorrow` or `in 4 days`.
    pub relative_time: String,
}

impl BinView {
    /// Render an entry as seen from `today`.
    #[must_use]
    pub fn render(entry: &CollectionEntry, today: NaiveDate) -> Self {
        Self {
            date: format_display_date(entry.date),
            image: entry.image.clone(),
            relative_time: relative_label(entry.date, today),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Successful `/bin-collection` body: `{"state":"ok","grey":{...},...}`.
pub struct ScheduleResponse {
    state: &'static str,
    #[serde(flatten)]
    bins: BTreeMap<BinCategory, BinView>,
}

impl ScheduleResponse {
    /// Rendered bins keyed by category.
    #[must_use]
    pub fn bins(&self) -> &BTreeMap<BinCategory, BinView> {
        &self.bins
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Failure body: `{"state":"error","message":"..."}`.
pub struct ErrorResponse {
    state: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ErrorResponse {
    /// Wrap a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            state: STATE_ERROR,
            message: message.into(),
        }
    }
}

impl From<&PortError> for ErrorResponse {
    fn from(err: &PortError) -> Self {
        ErrorResponse::new(err.to_string())
    }
}

/// Turn the pipeline outcome into the public response.
///
/// Failures pass through untouched so a partial schedule is never rendered.
/// An empty schedule is reported as [`PortError::NotFound`].
///
/// # Errors
///
/// Returns the pipeline error, or [`PortError::NotFound`] for an empty schedule.
pub fn assemble(
    result: Result<Schedule, PortError>,
    today: NaiveDate,
) -> Result<ScheduleResponse, PortError> {
    let schedule = result?;

    if schedule.is_empty() {
        return Err(PortError::NotFound);
    }

    let bins = schedule
        .entries()
        .map(|entry| (entry.category, BinView::render(entry, today)))
        .collect();

    Ok(ScheduleResponse {
        state: STATE_OK,
        bins,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn renders_flat_category_keys() {
        let schedule: Schedule = [
            CollectionEntry {
                category: BinCategory::Grey,
                date: ymd(2026, 1, 14),
                image: Some("https://example.org/grey.png".to_owned()),
            },
            CollectionEntry {
                category: BinCategory::Green,
                date: ymd(2026, 1, 11),
                image: None,
            },
        ]
        .into_iter()
        .collect();

        let response = assemble(Ok(schedule), ymd(2026, 1, 10)).expect("assembles");
        let body = serde_json::to_value(&response).expect("serializes");

        assert_eq!(
            body,
            json!({
                "state": "ok",
                "grey": {
                    "date": "14/01/2026",
                    "image": "https://example.org/grey.png",
                    "relative_time": "in 4 days"
                },
                "green": {
                    "date": "11/01/2026",
                    "relative_time": "tomorrow"
                }
            })
        );
    }

    #[test]
    fn empty_schedule_is_not_found() {
        let result = assemble(Ok(Schedule::new()), ymd(2026, 1, 10));
        assert!(matches!(result, Err(PortError::NotFound)));
    }

    #[test]
    fn failures_pass_through() {
        let result = assemble(Err(PortError::UpstreamStatus(500)), ymd(2026, 1, 10));
        assert!(matches!(result, Err(PortError::UpstreamStatus(500))));
    }

    #[test]
    fn error_body_carries_message() {
        let body = serde_json::to_value(ErrorResponse::from(&PortError::NotFound))
            .expect("serializes");
        assert_eq!(
            body,
            json!({"state": "error", "message": "No bin information found"})
        );
    }
}
