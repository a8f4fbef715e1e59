//! Adapter for Bolton's Verint e-forms bin collection API.
//!
//! The data endpoint wants a bearer credential handed out by the citizen
//! endpoint plus the CSRF token embedded in the portal page, and answers with
//! a JSON envelope whose `data.collection_dates` field is an HTML fragment.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, HeaderName, ORIGIN, REFERER, USER_AGENT,
};
use serde::{Deserialize, Serialize};

use binday_core::{
    date::{DateStyle, format_display_date},
    extract::{BlockLayout, extract_blocks},
    model::{
        CouncilId, CouncilMeta, PropertyRef, QueryKind, Schedule, Session, SessionCredential,
        UpstreamQuery,
    },
    plugin::CouncilPlugin,
    ports::{PortError, UpstreamAdapter},
    request::{UpstreamRequest, send_text},
};

const FORM_BASE_URL: &str = "https://bolton.form.uk.empro.verintcloudservices.com";
const PORTAL_BASE_URL: &str = "https://bolton.portal.uk.empro.verintcloudservices.com";

const CITIZEN_PATH: &str = "/api/citizen?archived=Y&preview=false&locale=en";
const PORTAL_FORM_PATH: &str = "/site/empro-bolton/request/es_bin_collection_dates";
const DATA_PATH: &str = "/api/custom?action=es_get_bin_collection_dates&actionedby=uprn_changed&loadform=true&access=citizen&locale=en";

const FORM_NAME: &str = "es_bin_collection_dates";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";
const BROWSER_LANGUAGE: &str = "en-GB,en-US;q=0.9,en;q=0.8";
const ACCEPT_JSON: &str = "application/json";
const ACCEPT_JSON_AJAX: &str = "application/json, text/javascript, */*; q=0.01";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/png,image/svg+xml,*/*;q=0.8";

const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");

static CSRF_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta name="_csrf_token" content="([^"]+)""#).expect("invalid regex: csrf meta")
});

/// Each bin stream is rendered as a floated container around its image and date list.
const LAYOUT: BlockLayout = BlockLayout {
    block: r#"div[style*="overflow:auto"]"#,
    label: "strong",
    date_item: "li",
    image: "img",
};

/// Body of the `/api/custom` data request.
#[derive(Debug, Serialize)]
struct DataRequest<'a> {
    name: &'a str,
    data: DataFields<'a>,
    email: &'a str,
    caseid: &'a str,
    xref: &'a str,
    xref1: &'a str,
    xref2: &'a str,
}

#[derive(Debug, Serialize)]
struct DataFields<'a> {
    uprn: &'a str,
    start_date: String,
    end_date: String,
}

/// Envelope returned by `/api/custom`.
#[derive(Debug, Deserialize)]
struct DataResponse {
    data: Option<DataPayload>,
    // the envelope also carries form metadata we have no use for
}

#[derive(Debug, Deserialize)]
struct DataPayload {
    collection_dates: Option<String>,
}

/// Upstream adapter for Bolton Council.
pub struct BoltonAdapter {
    client: Client,
    meta: CouncilMeta,
    form_base: String,
    portal_base: String,
}

impl BoltonAdapter {
    /// Create an adapter talking to the live Bolton portal.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_base_urls(client, FORM_BASE_URL, PORTAL_BASE_URL)
    }

    /// Create an adapter talking to other hosts, e.g. a local mock.
    #[must_use]
    pub fn with_base_urls(
        client: Client,
        form_base: impl Into<String>,
        portal_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            meta: council_meta(),
            form_base: form_base.into(),
            portal_base: portal_base.into(),
        }
    }

    /// Step one: the citizen endpoint hands out the bearer credential in a response header.
    async fn fetch_authorization(&self) -> Result<String, PortError> {
        let request = browser_request(format!("{}{CITIZEN_PATH}", self.form_base), ACCEPT_JSON)?
            .with_header(ORIGIN, &self.portal_base)?
            .with_header(REFERER, &format!("{}/", self.portal_base))?;

        let response = self
            .client
            .get(&request.url)
            .headers(request.headers)
            .send()
            .await
            .map_err(PortError::from)?;

        if !response.status().is_success() {
            return Err(PortError::Auth(format!(
                "citizen endpoint returned status {}",
                response.status().as_u16()
            )));
        }

        response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| PortError::Auth("No Authorization header from /api/citizen".to_owned()))
    }

    /// Step two: the portal page embeds the CSRF token in a meta tag.
    async fn fetch_csrf_token(&self) -> Result<String, PortError> {
        let request =
            browser_request(format!("{}{PORTAL_FORM_PATH}", self.portal_base), ACCEPT_HTML)?;

        let page = send_text(&self.client, request)
            .await
            .map_err(|err| match err {
                PortError::UpstreamStatus(status) => {
                    PortError::Auth(format!("portal page returned status {status}"))
                }
                other => other,
            })?;

        extract_csrf_token(&page)
            .ok_or_else(|| PortError::Auth("Could not extract CSRF token from portal".to_owned()))
    }
}

#[async_trait]
impl UpstreamAdapter for BoltonAdapter {
    fn council(&self) -> &CouncilMeta {
        &self.meta
    }

    fn query_kind(&self) -> QueryKind {
        QueryKind::Uprn
    }

    async fn negotiate(&self) -> Result<Session, PortError> {
        let authorization = self.fetch_authorization().await?;
        let csrf_token = self.fetch_csrf_token().await?;
        tracing::debug!(council = %self.meta.id, "obtained authorization and csrf token");

        Ok(Session::Credential(SessionCredential {
            authorization,
            csrf_token,
        }))
    }

    fn build_request(
        &self,
        query: &UpstreamQuery,
        session: Session,
    ) -> Result<UpstreamRequest, PortError> {
        let PropertyRef::Uprn(uprn) = &query.property else {
            return Err(PortError::InvalidQuery(
                "Bolton is queried by UPRN".to_owned(),
            ));
        };
        let Session::Credential(credential) = session else {
            return Err(PortError::Auth(
                "Bolton requires an authorization and CSRF token".to_owned(),
            ));
        };

        let payload = DataRequest {
            name: FORM_NAME,
            data: DataFields {
                uprn,
                start_date: format_display_date(query.window.start),
                end_date: format_display_date(query.window.end),
            },
            email: "",
            caseid: "",
            xref: "",
            xref1: "",
            xref2: "",
        };
        let body =
            serde_json::to_vec(&payload).map_err(|err| PortError::InvalidQuery(err.to_string()))?;

        UpstreamRequest::post(
            format!("{}{DATA_PATH}", self.form_base),
            "application/json",
            body,
        )?
        .with_header(ACCEPT, ACCEPT_JSON_AJAX)?
        .with_header(ACCEPT_LANGUAGE, BROWSER_LANGUAGE)?
        .with_header(X_CSRF_TOKEN, &credential.csrf_token)?
        .with_header(AUTHORIZATION, &credential.authorization)?
        .with_header(ORIGIN, &self.portal_base)?
        .with_header(REFERER, &format!("{}/", self.portal_base))?
        .with_header(USER_AGENT, BROWSER_USER_AGENT)
    }

    async fn send(&self, request: UpstreamRequest) -> Result<String, PortError> {
        send_text(&self.client, request).await
    }

    fn extract_schedule(&self, body: &str) -> Result<Schedule, PortError> {
        let envelope: DataResponse =
            serde_json::from_str(body).map_err(|err| PortError::Parse(err.to_string()))?;

        let html = envelope
            .data
            .and_then(|payload| payload.collection_dates)
            .filter(|fragment| !fragment.trim().is_empty())
            .ok_or_else(|| PortError::Parse("No collection data found in response".to_owned()))?;

        extract_blocks(&html, &LAYOUT, DateStyle::Embedded)
    }
}

/// Build the plugin bundle for the Bolton adapter.
#[must_use]
pub fn plugin(client: Client) -> CouncilPlugin {
    plugin_with_adapter(BoltonAdapter::new(client))
}

/// Build the plugin bundle around an already configured adapter.
#[must_use]
pub fn plugin_with_adapter(adapter: BoltonAdapter) -> CouncilPlugin {
    CouncilPlugin {
        meta: council_meta(),
        adapter: Arc::new(adapter),
    }
}

fn council_meta() -> CouncilMeta {
    CouncilMeta {
        id: CouncilId(String::from("bolton")),
        name: String::from("Bolton Council"),
    }
}

fn browser_request(url: String, accept: &str) -> Result<UpstreamRequest, PortError> {
    UpstreamRequest::get(url)
        .with_header(USER_AGENT, BROWSER_USER_AGENT)?
        .with_header(ACCEPT, accept)?
        .with_header(ACCEPT_LANGUAGE, BROWSER_LANGUAGE)
}

fn extract_csrf_token(page: &str) -> Option<String> {
    CSRF_META
        .captures(page)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_owned())
}
