use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use shared::error::FetchError;
use tokio::sync::{broadcast, Notify};

use crate::{timeline::Clock, SessionEvent, StripSnapshot, StripTransport};

/// Known-good 1x1 transparent PNG.
const PNG_1X1_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

pub fn png_fixture() -> Vec<u8> {
    STANDARD.decode(PNG_1X1_B64).expect("valid png fixture")
}

pub fn strip_page(id: &str, title: &str, image: &str) -> String {
    format!(
        r#"<html><body><div class="img-comic-container comic-item-container" data-id="{id}" data-title="{title}" data-image="{image}"><img alt=""></div></body></html>"#
    )
}

/// Settable "today" so timeline tests can cross midnight on demand.
pub struct TestClock {
    today: Mutex<NaiveDate>,
}

impl TestClock {
    pub fn at(key: &str) -> Arc<Self> {
        let day = NaiveDate::parse_from_str(key, "%Y-%m-%d").expect("valid test date");
        Arc::new(Self {
            today: Mutex::new(day),
        })
    }

    pub fn advance_days(&self, days: i64) {
        let mut today = self.today.lock().expect("clock lock");
        *today = *today + chrono::Duration::days(days);
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Local> {
        let day = *self.today.lock().expect("clock lock");
        Local
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).expect("valid time"))
            .single()
            .expect("unambiguous local time")
    }
}

/// Scripted transport double recording every call. Individual URLs can
/// be gated behind a `Notify` to hold a fetch in flight until the test
/// releases it.
#[derive(Default)]
pub struct TestTransport {
    pages: Mutex<HashMap<String, String>>,
    images: Mutex<HashMap<String, Vec<u8>>>,
    page_calls: Mutex<Vec<String>>,
    image_calls: Mutex<Vec<String>>,
    page_gates: Mutex<HashMap<String, Arc<Notify>>>,
    image_gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl TestTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_page(&self, url: &str, body: String) {
        self.pages
            .lock()
            .expect("pages lock")
            .insert(url.to_string(), body);
    }

    pub fn set_image(&self, url: &str, bytes: Vec<u8>) {
        self.images
            .lock()
            .expect("images lock")
            .insert(url.to_string(), bytes);
    }

    pub fn gate_page(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.page_gates
            .lock()
            .expect("gates lock")
            .insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn gate_image(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.image_gates
            .lock()
            .expect("gates lock")
            .insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn page_calls(&self) -> Vec<String> {
        self.page_calls.lock().expect("calls lock").clone()
    }

    pub fn image_calls(&self) -> Vec<String> {
        self.image_calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl StripTransport for TestTransport {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.page_calls
            .lock()
            .expect("calls lock")
            .push(url.to_string());
        let gate = self.page_gates.lock().expect("gates lock").get(url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.pages
            .lock()
            .expect("pages lock")
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.image_calls
            .lock()
            .expect("calls lock")
            .push(url.to_string());
        let gate = self
            .image_gates
            .lock()
            .expect("gates lock")
            .get(url)
            .cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.images
            .lock()
            .expect("images lock")
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

pub async fn next_snapshot(rx: &mut broadcast::Receiver<SessionEvent>) -> StripSnapshot {
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed");
    let SessionEvent::StripChanged(snapshot) = event;
    snapshot
}

pub async fn expect_no_event(rx: &mut broadcast::Receiver<SessionEvent>) {
    let outcome = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(outcome.is_err(), "expected silence, got {outcome:?}");
}
