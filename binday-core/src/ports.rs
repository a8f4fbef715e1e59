//! Traits describing upstream adapter capabilities and the shared error type.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{CouncilMeta, QueryKind, Schedule, Session, UpstreamQuery};
use crate::request::UpstreamRequest;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to council portals.
pub enum PortError {
    /// Session, CSRF, or form-state acquisition failed.
    #[error("Failed to get auth token: {0}")]
    Auth(String),
    /// Network layer failed.
    #[error("Problem with request: {0}")]
    Transport(#[source] ReqwestError),
    /// Upstream answered with a non-success status.
    #[error("Request failed with status code: {0}")]
    UpstreamStatus(u16),
    /// Response body could not be understood.
    #[error("Error parsing response: {0}")]
    Parse(String),
    /// Upstream answered but no bin block could be extracted.
    #[error("No bin information found")]
    NotFound,
    /// The pipeline did not finish before its deadline.
    #[error("Upstream did not respond within {0:?}")]
    Timeout(Duration),
    /// The query does not fit the adapter it was sent to.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// No adapter is registered for the council.
    #[error("Unsupported council")]
    UnsupportedCouncil,
}

impl From<ReqwestError> for PortError {
    fn from(err: ReqwestError) -> Self {
        // Upstream URLs carry session query strings; keep them out of messages.
        PortError::Transport(err.without_url())
    }
}

#[async_trait]
/// A council portal the pipeline can query.
///
/// One call to [`crate::service::BinService::collect`] drives the stages in
/// order: [`negotiate`](Self::negotiate), [`build_request`](Self::build_request),
/// [`send`](Self::send), [`extract_schedule`](Self::extract_schedule).
pub trait UpstreamAdapter: Send + Sync {
    /// Metadata describing the council handled by this adapter.
    fn council(&self) -> &CouncilMeta;

    /// Inbound parameters this adapter needs.
    fn query_kind(&self) -> QueryKind;

    /// Acquire whatever session state the data request needs.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Auth`] when the portal withholds a credential, or
    /// [`PortError::Transport`] when it cannot be reached.
    async fn negotiate(&self) -> Result<Session, PortError>;

    /// Build the data request for `query`, consuming the negotiated session.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the query or session does not fit this adapter.
    fn build_request(
        &self,
        query: &UpstreamQuery,
        session: Session,
    ) -> Result<UpstreamRequest, PortError>;

    /// Issue a request and return the response body.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Transport`] or [`PortError::UpstreamStatus`].
    async fn send(&self, request: UpstreamRequest) -> Result<String, PortError>;

    /// Turn a response body into a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Parse`] when the body is not in the expected shape.
    fn extract_schedule(&self, body: &str) -> Result<Schedule, PortError>;
}
