use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use binday_core::{
    AdapterRegistry, BinCategory, BinService, BlockLayout, CouncilId, CouncilMeta, CouncilPlugin,
    DateStyle, PortError, PropertyRef, QueryKind, Schedule, Session, UpstreamAdapter,
    UpstreamQuery, UpstreamRequest, extract_blocks, send_text,
};
use chrono::NaiveDate;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAYOUT: BlockLayout = BlockLayout {
    block: "div.bin",
    label: "strong",
    date_item: "li",
    image: "img",
};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
}

/// In-memory adapter that records how far the pipeline got.
struct FakeAdapter {
    meta: CouncilMeta,
    negotiate_fails: bool,
    delay: Duration,
    body: String,
    sends: AtomicUsize,
}

impl FakeAdapter {
    fn new(body: &str) -> Self {
        Self {
            meta: CouncilMeta {
                id: CouncilId::from("fake"),
                name: "Fake".to_owned(),
            },
            negotiate_fails: false,
            delay: Duration::ZERO,
            body: body.to_owned(),
            sends: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl UpstreamAdapter for FakeAdapter {
    fn council(&self) -> &CouncilMeta {
        &self.meta
    }

    fn query_kind(&self) -> QueryKind {
        QueryKind::Uprn
    }

    async fn negotiate(&self) -> Result<Session, PortError> {
        if self.negotiate_fails {
            return Err(PortError::Auth("no Authorization header".to_owned()));
        }
        Ok(Session::Anonymous)
    }

    fn build_request(
        &self,
        query: &UpstreamQuery,
        _session: Session,
    ) -> Result<UpstreamRequest, PortError> {
        assert_eq!(query.window.start, today());
        Ok(UpstreamRequest::get("http://fake.invalid/"))
    }

    async fn send(&self, _request: UpstreamRequest) -> Result<String, PortError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.body.clone())
    }

    fn extract_schedule(&self, body: &str) -> Result<Schedule, PortError> {
        extract_blocks(body, &LAYOUT, DateStyle::Weekday)
    }
}

fn service_for(adapter: Arc<FakeAdapter>) -> BinService {
    let registry = AdapterRegistry::new(vec![CouncilPlugin {
        meta: adapter.meta.clone(),
        adapter,
    }]);
    BinService::new(Arc::new(registry)).with_clock(today)
}

fn uprn() -> PropertyRef {
    PropertyRef::Uprn("100010920644".to_owned())
}

#[tokio::test]
async fn pipeline_renders_all_four_bins() {
    let adapter = Arc::new(FakeAdapter::new(&load_fixture("four_bins.html")));
    let service = service_for(Arc::clone(&adapter));

    let response = service
        .collect(&CouncilId::from("fake"), uprn())
        .await
        .unwrap();

    assert_eq!(response.bins().len(), 4);
    for view in response.bins().values() {
        assert!(!view.date.is_empty());
        assert!(view.image.as_deref().is_some_and(|image| !image.is_empty()));
        assert!(!view.relative_time.is_empty());
    }

    let grey = &response.bins()[&BinCategory::Grey];
    assert_eq!(grey.date, "14/01/2026");
    assert_eq!(grey.relative_time, "in 4 days");
}

#[tokio::test]
async fn negotiation_failure_stops_the_pipeline() {
    let mut fake = FakeAdapter::new(&load_fixture("four_bins.html"));
    fake.negotiate_fails = true;
    let adapter = Arc::new(fake);
    let service = service_for(Arc::clone(&adapter));

    let result = service.collect(&CouncilId::from("fake"), uprn()).await;

    assert!(matches!(result, Err(PortError::Auth(_))));
    assert_eq!(adapter.sends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_extraction_is_not_found() {
    let adapter = Arc::new(FakeAdapter::new("<html><body><p>Nothing here</p></body></html>"));
    let service = service_for(adapter);

    let result = service.collect(&CouncilId::from("fake"), uprn()).await;

    assert!(matches!(result, Err(PortError::NotFound)));
}

#[tokio::test]
async fn slow_upstream_hits_the_deadline() {
    let mut fake = FakeAdapter::new(&load_fixture("four_bins.html"));
    fake.delay = Duration::from_secs(5);
    let service = service_for(Arc::new(fake)).with_timeout(Duration::from_millis(50));

    let result = service.collect(&CouncilId::from("fake"), uprn()).await;

    assert!(matches!(result, Err(PortError::Timeout(_))));
}

#[tokio::test]
async fn wrong_property_kind_is_rejected() {
    let service = service_for(Arc::new(FakeAdapter::new("")));

    let result = service
        .collect(
            &CouncilId::from("fake"),
            PropertyRef::PostcodeAddress {
                postcode: "BL2 4DS".to_owned(),
                address: "1".to_owned(),
            },
        )
        .await;

    assert!(matches!(result, Err(PortError::InvalidQuery(_))));
}

#[tokio::test]
async fn unknown_council_is_unsupported() {
    let service = service_for(Arc::new(FakeAdapter::new("")));

    let result = service.collect(&CouncilId::from("wigan"), uprn()).await;

    assert!(matches!(result, Err(PortError::UnsupportedCouncil)));
}

#[tokio::test]
async fn send_text_maps_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&mock_server)
        .await;

    let request = UpstreamRequest::get(format!("{}/data", mock_server.uri()));
    let result = send_text(&reqwest::Client::new(), request).await;

    assert!(matches!(result, Err(PortError::UpstreamStatus(503))));
}

#[tokio::test]
async fn send_text_posts_body_with_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/data"))
        .and(header("content-type", "application/json"))
        .and(header("content-length", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = UpstreamRequest::post(
        format!("{}/data", mock_server.uri()),
        "application/json",
        br#"{"a":"bcd"}"#.to_vec(),
    )
    .unwrap();
    let body = send_text(&reqwest::Client::new(), request).await.unwrap();

    assert_eq!(body, "ok");
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_error() {
    // Port 9 (discard) on localhost is not served by anything in the test environment.
    let request = UpstreamRequest::get("http://127.0.0.1:9/");
    let result = send_text(&reqwest::Client::new(), request).await;

    assert!(matches!(result, Err(PortError::Transport(_))));
}
