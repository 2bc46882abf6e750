use std::{collections::HashMap, sync::Arc};

use image::DynamicImage;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod scrape;
pub mod timeline;
pub mod transport;

pub use scrape::StripScraper;
pub use timeline::{Clock, SystemClock, Timeline};
pub use transport::{HttpTransport, StripTransport};

#[cfg(test)]
mod tests;

/// Decoded strip artwork, shared between the display state and both
/// caches without copying pixel data.
pub type StripImage = Arc<DynamicImage>;

/// One complete, consistent displayable state. Every publish carries
/// all observable fields together so subscribers never render a
/// half-updated combination (new title over an old image).
#[derive(Debug, Clone)]
pub struct StripSnapshot {
    pub id: String,
    pub strip_name: String,
    pub title: String,
    pub image: StripImage,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StripChanged(StripSnapshot),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub base_url: String,
    pub strip_name: String,
}

struct CachedStrip {
    title: String,
    image: StripImage,
}

struct SessionState {
    /// Key of the most recent request. A page completion whose issue
    /// token no longer matches has been superseded and is discarded.
    requested_id: String,
    /// Date key of the strip actually displayed, the reference point
    /// for the stale-image guard.
    current_id: String,
    title: String,
    displayed_image: StripImage,
    /// date key -> fully resolved strip; revisiting a day never
    /// re-fetches. Unbounded for the session lifetime.
    strip_cache: HashMap<String, CachedStrip>,
    /// artwork url -> decoded bitmap; deduplicates reruns that point
    /// different strips at the same image.
    image_cache: HashMap<String, StripImage>,
}

/// Fetch-or-serve-from-cache orchestrator for the strip identified by
/// the timeline's current key.
///
/// All mutable state lives behind one mutex; completions of the two
/// background fetches re-acquire it before touching anything, and the
/// supersession guards decide whether their result still applies.
/// Recoverable failures never surface: the session logs them and keeps
/// the last displayed strip.
pub struct ComicSession {
    transport: Arc<dyn StripTransport>,
    scraper: StripScraper,
    base_url: String,
    strip_name: String,
    placeholder: StripImage,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl ComicSession {
    pub fn new(options: SessionOptions) -> Arc<Self> {
        Self::new_with_transport(options, Arc::new(HttpTransport::new()))
    }

    pub fn new_with_transport(
        options: SessionOptions,
        transport: Arc<dyn StripTransport>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        let placeholder: StripImage = Arc::new(DynamicImage::ImageRgba8(image::RgbaImage::new(1, 1)));
        Arc::new(Self {
            transport,
            scraper: StripScraper::new(),
            base_url: options.base_url.trim_end_matches('/').to_string(),
            strip_name: options.strip_name,
            placeholder: Arc::clone(&placeholder),
            inner: Mutex::new(SessionState {
                requested_id: String::new(),
                current_id: String::new(),
                title: String::new(),
                displayed_image: placeholder,
                strip_cache: HashMap::new(),
                image_cache: HashMap::new(),
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Blank bitmap shown while a strip's artwork is still resolving.
    pub fn placeholder_image(&self) -> StripImage {
        Arc::clone(&self.placeholder)
    }

    pub async fn snapshot(&self) -> StripSnapshot {
        let guard = self.inner.lock().await;
        self.snapshot_of(&guard)
    }

    fn snapshot_of(&self, state: &SessionState) -> StripSnapshot {
        StripSnapshot {
            id: state.current_id.clone(),
            strip_name: self.strip_name.clone(),
            title: state.title.clone(),
            image: Arc::clone(&state.displayed_image),
        }
    }

    /// Bring the displayed strip in line with `date_key`.
    ///
    /// No-op when that key is already displayed (the clamped
    /// navigation case). A cached strip is served synchronously with
    /// zero transport calls; otherwise the page fetch runs in the
    /// background and an in-flight older request is implicitly
    /// superseded, its completions discarded when they arrive.
    pub async fn refresh(self: &Arc<Self>, date_key: &str) {
        {
            let mut guard = self.inner.lock().await;
            if guard.current_id == date_key {
                return;
            }
            if let Some(cached) = guard.strip_cache.get(date_key) {
                let (title, image) = (cached.title.clone(), Arc::clone(&cached.image));
                guard.requested_id = date_key.to_string();
                guard.current_id = date_key.to_string();
                guard.title = title;
                guard.displayed_image = image;
                info!(id = %date_key, "strip: served from cache");
                let snapshot = self.snapshot_of(&guard);
                drop(guard);
                let _ = self.events.send(SessionEvent::StripChanged(snapshot));
                return;
            }
            guard.requested_id = date_key.to_string();
        }
        self.spawn_strip_request(Some(date_key.to_string()));
    }

    /// Fetch whatever strip the remote currently serves at `{base}/`
    /// and adopt its authoritative id.
    pub async fn refresh_latest(self: &Arc<Self>) {
        {
            let mut guard = self.inner.lock().await;
            guard.requested_id.clear();
        }
        self.spawn_strip_request(None);
    }

    fn spawn_strip_request(self: &Arc<Self>, date_key: Option<String>) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.run_strip_request(date_key).await;
        });
    }

    async fn run_strip_request(&self, date_key: Option<String>) {
        let url = match &date_key {
            Some(key) => format!("{}/strip/{key}", self.base_url),
            None => format!("{}/", self.base_url),
        };
        // Supersession token: the requested key, captured at issue
        // time ("" for a latest-strip request).
        let token = date_key.unwrap_or_default();

        let html = match self.transport.fetch_page(&url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(url = %url, error = %err, "strip: page fetch failed");
                return;
            }
        };

        let strip = match self.scraper.scrape(&html) {
            Ok(strip) => strip,
            Err(err) => {
                warn!(url = %url, error = %err, "strip: scrape failed");
                return;
            }
        };

        {
            let mut guard = self.inner.lock().await;
            if guard.requested_id != token {
                info!(
                    requested = %token,
                    latest = %guard.requested_id,
                    "strip: discarding superseded page response"
                );
                return;
            }
            guard.current_id = strip.id.clone();
            guard.title = strip.title.clone();
            // Placeholder until the artwork resolves, so the new title
            // is never shown over the previous strip's image.
            guard.displayed_image = Arc::clone(&self.placeholder);
            let snapshot = self.snapshot_of(&guard);
            drop(guard);
            let _ = self.events.send(SessionEvent::StripChanged(snapshot));
        }

        let Some(image_url) = strip.image_url.as_deref() else {
            info!(id = %strip.id, "strip: page carries no artwork reference");
            return;
        };

        let Some(image) = self.resolve_image(image_url).await else {
            return;
        };

        let snapshot = {
            let mut guard = self.inner.lock().await;
            // Stale-completion guard: a newer refresh owns the session
            // if the displayed id moved on while the artwork was in
            // flight.
            if guard.current_id != strip.id {
                info!(
                    id = %strip.id,
                    current = %guard.current_id,
                    "strip: discarding stale image completion"
                );
                return;
            }
            guard.displayed_image = Arc::clone(&image);
            guard.strip_cache.insert(
                strip.id.clone(),
                CachedStrip {
                    title: strip.title.clone(),
                    image: Arc::clone(&image),
                },
            );
            self.snapshot_of(&guard)
        };
        let _ = self.events.send(SessionEvent::StripChanged(snapshot));
    }

    async fn resolve_image(&self, url: &str) -> Option<StripImage> {
        {
            let guard = self.inner.lock().await;
            if let Some(image) = guard.image_cache.get(url) {
                return Some(Arc::clone(image));
            }
        }

        let bytes = match self.transport.fetch_image(url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(url = %url, error = %err, "strip: image fetch failed");
                return None;
            }
        };

        let decoded = match image::load_from_memory(&bytes) {
            Ok(decoded) => Arc::new(decoded),
            Err(err) => {
                warn!(url = %url, error = %err, "strip: image decode failed");
                return None;
            }
        };

        let mut guard = self.inner.lock().await;
        let image = guard
            .image_cache
            .entry(url.to_string())
            .or_insert_with(|| Arc::clone(&decoded));
        Some(Arc::clone(image))
    }
}
