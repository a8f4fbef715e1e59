//! High-level pipeline service combining all council adapters.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::assemble::{ScheduleResponse, assemble};
use crate::model::{CouncilId, CouncilMeta, PropertyRef, QueryKind, Schedule, UpstreamQuery};
use crate::plugin::AdapterRegistry;
use crate::ports::{PortError, UpstreamAdapter};

/// Deadline applied to a whole pipeline run unless overridden.
pub const DEFAULT_PIPELINE_TIMEOUT: Duration = Duration::from_secs(30);

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Public entry point for fetching a council's collection schedule.
pub struct BinService {
    registry: Arc<AdapterRegistry>,
    timeout: Duration,
    clock: Clock,
}

impl BinService {
    /// Create a new service bound to the provided registry.
    #[must_use]
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_PIPELINE_TIMEOUT,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the pipeline deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the source of "today", used for the query window and labels.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// List all registered councils.
    #[must_use]
    pub fn councils(&self) -> Vec<CouncilMeta> {
        self.registry.councils()
    }

    /// Inbound parameters the council's adapter needs.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::UnsupportedCouncil`] if no adapter is registered.
    pub fn query_kind(&self, council: &CouncilId) -> Result<QueryKind, PortError> {
        Ok(self.registry.adapter(council)?.query_kind())
    }

    /// Run the full pipeline for a property and render the response.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's [`PortError`], [`PortError::Timeout`]
    /// if the deadline expires, or [`PortError::NotFound`] if nothing was extracted.
    pub async fn collect(
        &self,
        council: &CouncilId,
        property: PropertyRef,
    ) -> Result<ScheduleResponse, PortError> {
        let adapter = self.registry.adapter(council)?;
        check_kind(adapter.query_kind(), &property)?;

        let today = (self.clock)();
        let query = UpstreamQuery::new(property, today);

        let outcome = tokio::time::timeout(self.timeout, run_pipeline(adapter.as_ref(), &query))
            .await
            .unwrap_or(Err(PortError::Timeout(self.timeout)));

        if let Err(err) = &outcome {
            tracing::warn!(%council, error = %err, "bin collection pipeline failed");
        }

        assemble(outcome, today)
    }
}

async fn run_pipeline(
    adapter: &dyn UpstreamAdapter,
    query: &UpstreamQuery,
) -> Result<Schedule, PortError> {
    let council = &adapter.council().id;

    let session = adapter.negotiate().await?;
    tracing::debug!(%council, "session negotiated");

    let request = adapter.build_request(query, session)?;
    tracing::debug!(%council, url = %request.url, body_len = request.body_len(), "sending data request");

    let body = adapter.send(request).await?;
    let schedule = adapter.extract_schedule(&body)?;
    tracing::debug!(%council, bins = schedule.len(), "schedule extracted");

    Ok(schedule)
}

fn check_kind(kind: QueryKind, property: &PropertyRef) -> Result<(), PortError> {
    match (kind, property) {
        (QueryKind::Uprn, PropertyRef::Uprn(_))
        | (QueryKind::PostcodeAddress, PropertyRef::PostcodeAddress { .. }) => Ok(()),
        (QueryKind::Uprn, PropertyRef::PostcodeAddress { .. }) => Err(PortError::InvalidQuery(
            String::from("this council is queried by UPRN"),
        )),
        (QueryKind::PostcodeAddress, PropertyRef::Uprn(_)) => Err(PortError::InvalidQuery(
            String::from("this council is queried by postcode and address"),
        )),
    }
}
