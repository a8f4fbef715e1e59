//! Adapter for Bolton's legacy ASP.NET bin collection form.
//!
//! The form is a classic web-forms postback: the page hands out hidden
//! `__VIEWSTATE` / `__EVENTVALIDATION` fields that must be posted back along
//! with the postcode and the selected address. The answer is a full HTML page
//! listing one block per bin.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, ORIGIN, REFERER, SET_COOKIE, USER_AGENT};
use scraper::{Html, Selector};
use url::{Url, form_urlencoded};

use binday_core::{
    date::DateStyle,
    extract::{BlockLayout, extract_blocks},
    model::{
        CouncilId, CouncilMeta, FormState, PropertyRef, QueryKind, Schedule, Session,
        UpstreamQuery,
    },
    plugin::CouncilPlugin,
    ports::{PortError, UpstreamAdapter},
    request::{UpstreamRequest, send_text},
};

const FORM_URL: &str = "https://www.bolton.gov.uk/binday/CollectionDates.aspx";

const VIEW_STATE: &str = "__VIEWSTATE";
const VIEW_STATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
const EVENT_VALIDATION: &str = "__EVENTVALIDATION";
const EVENT_TARGET: &str = "__EVENTTARGET";
const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";

const POSTCODE_FIELD: &str = "ctl00$MainContent$txtPostcode";
const ADDRESS_FIELD: &str = "ctl00$MainContent$ddlAddress";
const SUBMIT_FIELD: &str = "ctl00$MainContent$btnShowDates";
const SUBMIT_VALUE: &str = "Show collection dates";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";
const BROWSER_LANGUAGE: &str = "en-GB,en-US;q=0.9,en;q=0.8";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const LAYOUT: BlockLayout = BlockLayout {
    block: "div.bin-collection",
    label: "strong, b",
    date_item: "li",
    image: "img",
};

/// Upstream adapter for the legacy Bolton collection-dates form.
pub struct BoltonLegacyAdapter {
    client: Client,
    meta: CouncilMeta,
    form_url: String,
}

impl BoltonLegacyAdapter {
    /// Create an adapter posting to the live form.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_form_url(client, FORM_URL)
    }

    /// Create an adapter posting to another form URL.
    #[must_use]
    pub fn with_form_url(client: Client, form_url: impl Into<String>) -> Self {
        Self {
            client,
            meta: council_meta(),
            form_url: form_url.into(),
        }
    }

    fn origin(&self) -> Option<String> {
        Url::parse(&self.form_url)
            .ok()
            .map(|url| url.origin().ascii_serialization())
    }
}

#[async_trait]
impl UpstreamAdapter for BoltonLegacyAdapter {
    fn council(&self) -> &CouncilMeta {
        &self.meta
    }

    fn query_kind(&self) -> QueryKind {
        QueryKind::PostcodeAddress
    }

    async fn negotiate(&self) -> Result<Session, PortError> {
        let response = self
            .client
            .get(&self.form_url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, BROWSER_LANGUAGE)
            .send()
            .await
            .map_err(PortError::from)?;

        if !response.status().is_success() {
            return Err(PortError::Auth(format!(
                "collection form returned status {}",
                response.status().as_u16()
            )));
        }

        let cookie = session_cookie(response.headers().get_all(SET_COOKIE).iter().filter_map(
            |value| value.to_str().ok(),
        ));
        let page = response.text().await.map_err(PortError::from)?;

        let form_state = extract_form_state(&page, cookie)?;
        tracing::debug!(
            council = %self.meta.id,
            view_state_len = form_state.view_state.len(),
            "obtained form state"
        );

        Ok(Session::Form(form_state))
    }

    fn build_request(
        &self,
        query: &UpstreamQuery,
        session: Session,
    ) -> Result<UpstreamRequest, PortError> {
        let PropertyRef::PostcodeAddress { postcode, address } = &query.property else {
            return Err(PortError::InvalidQuery(
                "the legacy form is queried by postcode and address".to_owned(),
            ));
        };
        let Session::Form(form_state) = session else {
            return Err(PortError::Auth(
                "the legacy form requires view state".to_owned(),
            ));
        };

        let body = encode_postback(&form_state, postcode, address);

        let mut request = UpstreamRequest::post(&self.form_url, FORM_CONTENT_TYPE, body.into_bytes())?
            .with_header(ACCEPT, ACCEPT_HTML)?
            .with_header(ACCEPT_LANGUAGE, BROWSER_LANGUAGE)?
            .with_header(REFERER, &self.form_url)?
            .with_header(USER_AGENT, BROWSER_USER_AGENT)?;

        if let Some(origin) = self.origin() {
            request = request.with_header(ORIGIN, &origin)?;
        }
        if let Some(cookie) = &form_state.cookie {
            request = request.with_header(COOKIE, cookie)?;
        }

        Ok(request)
    }

    async fn send(&self, request: UpstreamRequest) -> Result<String, PortError> {
        send_text(&self.client, request).await
    }

    fn extract_schedule(&self, body: &str) -> Result<Schedule, PortError> {
        extract_blocks(body, &LAYOUT, DateStyle::Weekday)
    }
}

/// Build the plugin bundle for the legacy form adapter.
#[must_use]
pub fn plugin(client: Client) -> CouncilPlugin {
    plugin_with_adapter(BoltonLegacyAdapter::new(client))
}

/// Build the plugin bundle around an already configured adapter.
#[must_use]
pub fn plugin_with_adapter(adapter: BoltonLegacyAdapter) -> CouncilPlugin {
    CouncilPlugin {
        meta: council_meta(),
        adapter: Arc::new(adapter),
    }
}

fn council_meta() -> CouncilMeta {
    CouncilMeta {
        id: CouncilId(String::from("bolton-legacy")),
        name: String::from("Bolton Council (legacy form)"),
    }
}

/// Read the hidden postback fields from the form page.
fn extract_form_state(page: &str, cookie: Option<String>) -> Result<FormState, PortError> {
    let document = Html::parse_document(page);

    let view_state = hidden_input(&document, VIEW_STATE)?
        .ok_or_else(|| PortError::Auth("Could not extract view state from form".to_owned()))?;
    let event_validation = hidden_input(&document, EVENT_VALIDATION)?.ok_or_else(|| {
        PortError::Auth("Could not extract event validation from form".to_owned())
    })?;
    let view_state_generator = hidden_input(&document, VIEW_STATE_GENERATOR)?.unwrap_or_default();

    Ok(FormState {
        view_state,
        view_state_generator,
        event_validation,
        cookie,
    })
}

fn hidden_input(document: &Html, name: &str) -> Result<Option<String>, PortError> {
    let selector = Selector::parse(&format!(r#"input[name="{name}"]"#))
        .map_err(|err| PortError::Parse(format!("invalid CSS selector for {name}: {err}")))?;

    Ok(document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .filter(|value| !value.is_empty())
        .map(str::to_owned))
}

/// Collapse `Set-Cookie` headers into a single `Cookie` header value.
fn session_cookie<'a>(set_cookies: impl Iterator<Item = &'a str>) -> Option<String> {
    let pairs: Vec<&str> = set_cookies
        .filter_map(|set_cookie| set_cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

fn encode_postback(form_state: &FormState, postcode: &str, address: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair(EVENT_TARGET, "")
        .append_pair(EVENT_ARGUMENT, "")
        .append_pair(VIEW_STATE, &form_state.view_state)
        .append_pair(VIEW_STATE_GENERATOR, &form_state.view_state_generator)
        .append_pair(EVENT_VALIDATION, &form_state.event_validation)
        .append_pair(POSTCODE_FIELD, postcode)
        .append_pair(ADDRESS_FIELD, address)
        .append_pair(SUBMIT_FIELD, SUBMIT_VALUE)
        .finish()
}
