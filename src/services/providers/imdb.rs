//! IMDb movie-connections provider
//!
//! Scrapes `/title/{id}/movieconnections/`. The page carries a jump menu with
//! one `<option value="#follows">Follows (7)</option>` per connection kind,
//! which is where declared counts come from, and one section per kind
//! listing the linked titles. Only the first `disclosure_cap` links of a
//! section are handed out per call, matching what the site shows before its
//! "see more" expander.
//!
//! Parsed pages are cached in Redis for a day; the markup is fragile, so any
//! count that cannot be read degrades to zero instead of failing.

use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey},
    error::ProviderError,
    models::{DisclosureBatch, Direction, TitleId},
    services::providers::ConnectionProvider,
};
use reqwest::{header, Client as HttpClient, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};

const PAGE_CACHE_TTL: u64 = 86400; // 1 day

/// Connection data extracted from one title's page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionsPage {
    pub follows_count: usize,
    pub followed_by_count: usize,
    pub follows: Vec<TitleId>,
    pub followed_by: Vec<TitleId>,
}

impl ConnectionsPage {
    pub fn declared(&self, direction: Direction) -> usize {
        match direction {
            Direction::Forward => self.follows_count,
            Direction::Backward => self.followed_by_count,
        }
    }

    pub fn links(&self, direction: Direction) -> &[TitleId] {
        match direction {
            Direction::Forward => &self.follows,
            Direction::Backward => &self.followed_by,
        }
    }
}

/// Spaces out upstream requests
struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: None,
            min_interval,
        }
    }

    async fn wait_turn(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

#[derive(Clone)]
pub struct ImdbConnectionProvider {
    http_client: HttpClient,
    base_url: String,
    cache: Cache,
    disclosure_cap: usize,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    pages: Arc<PageMemo>,
}

/// In-process copy of parsed pages, checked before Redis
///
/// Count and batch calls in both directions share one page per title.
struct PageMemo {
    entries: std::sync::Mutex<HashMap<TitleId, (Instant, ConnectionsPage)>>,
    ttl: Duration,
}

impl PageMemo {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: std::sync::Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn get(&self, id: &TitleId) -> Option<ConnectionsPage> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(id) {
            Some((stored, page)) if stored.elapsed() < self.ttl => Some(page.clone()),
            Some(_) => {
                entries.remove(id);
                None
            }
            None => None,
        }
    }

    fn insert(&self, id: TitleId, page: ConnectionsPage) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(id, (Instant::now(), page));
        }
    }
}

impl ImdbConnectionProvider {
    pub fn new(config: &Config, cache: Cache) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        let user_agent = header::HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ProviderError::Unavailable(format!("Invalid user agent: {}", e)))?;
        headers.insert(header::USER_AGENT, user_agent);

        let http_client = HttpClient::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.connections_base_url.trim_end_matches('/').to_string(),
            cache,
            disclosure_cap: config.disclosure_cap.max(1),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(config.min_request_interval()))),
            pages: Arc::new(PageMemo::new(Duration::from_secs(PAGE_CACHE_TTL))),
        })
    }

    async fn page(&self, id: &TitleId) -> Result<ConnectionsPage, ProviderError> {
        if let Some(page) = self.pages.get(id) {
            return Ok(page);
        }

        let page: ConnectionsPage = cached!(
            self.cache,
            CacheKey::ConnectionsPage(id.clone()),
            PAGE_CACHE_TTL,
            self.fetch_page(id)
        )?;
        self.pages.insert(id.clone(), page.clone());
        Ok(page)
    }

    async fn fetch_page(&self, id: &TitleId) -> Result<ConnectionsPage, ProviderError> {
        self.rate_limiter.lock().await.wait_turn().await;

        let url = format!("{}/title/{}/movieconnections/", self.base_url, id);
        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(title_id = %id, "Connections page rate limited");
            return Err(ProviderError::RateLimited(id.to_string()));
        }
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "Connections page for {} returned status {}",
                id, status
            )));
        }

        let html = response.text().await?;
        let page = parse_connections_page(id, &html);

        tracing::debug!(
            title_id = %id,
            follows = page.follows_count,
            followed_by = page.followed_by_count,
            "Fetched connections page"
        );

        Ok(page)
    }
}

#[async_trait::async_trait]
impl ConnectionProvider for ImdbConnectionProvider {
    #[tracing::instrument(skip(self), fields(provider = "imdb"))]
    async fn link_count(&self, id: &TitleId, direction: Direction) -> Result<usize, ProviderError> {
        Ok(self.page(id).await?.declared(direction))
    }

    #[tracing::instrument(skip(self), fields(provider = "imdb"))]
    async fn next_batch(
        &self,
        id: &TitleId,
        direction: Direction,
    ) -> Result<DisclosureBatch, ProviderError> {
        let page = self.page(id).await?;
        let ids = page
            .links(direction)
            .iter()
            .take(self.disclosure_cap)
            .cloned()
            .collect();
        Ok(DisclosureBatch::new(id.clone(), direction, ids))
    }

    fn name(&self) -> &'static str {
        "imdb"
    }
}

/// Extracts counts and links for both directions from a connections page
pub fn parse_connections_page(page_id: &TitleId, html: &str) -> ConnectionsPage {
    let doc = Html::parse_document(html);
    ConnectionsPage {
        follows_count: parse_declared_count(&doc, Direction::Forward),
        followed_by_count: parse_declared_count(&doc, Direction::Backward),
        follows: parse_linked_ids(&doc, page_id, Direction::Forward),
        followed_by: parse_linked_ids(&doc, page_id, Direction::Backward),
    }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(selector = css, error = %e, "Invalid selector");
            None
        }
    }
}

fn parse_declared_count(doc: &Html, direction: Direction) -> usize {
    let css = format!(r##"option[value="#{}"]"##, direction.section_key());
    let Some(option) = selector(&css).and_then(|s| doc.select(&s).next()) else {
        return 0;
    };

    let text: String = option.text().collect();
    let count = text
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .and_then(|(inner, _)| inner.trim().replace(',', "").parse::<usize>().ok());

    match count {
        Some(n) => n,
        None => {
            tracing::debug!(text = %text, %direction, "Unparseable connection count");
            0
        }
    }
}

fn parse_linked_ids(doc: &Html, page_id: &TitleId, direction: Direction) -> Vec<TitleId> {
    let key = direction.section_key();
    let mut ids = section_links(doc, key);
    if ids.is_empty() {
        ids = legacy_section_links(doc, key);
    }

    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| id != page_id && seen.insert(id.clone()));
    ids
}

/// Current layout: one container tagged with `data-testid="sub-section-{key}"`
fn section_links(doc: &Html, key: &str) -> Vec<TitleId> {
    let css = format!(r#"[data-testid="sub-section-{}"] a[href^="/title/"]"#, key);
    let Some(sel) = selector(&css) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(title_id_from_href)
        .collect()
}

/// Older layout: `<a name="{key}">` followed by sibling `div.soda` rows,
/// up to the next named anchor
fn legacy_section_links(doc: &Html, key: &str) -> Vec<TitleId> {
    let css = format!(r#"a[name="{}"]"#, key);
    let (Some(anchor_sel), Some(link_sel)) = (selector(&css), selector(r#"a[href^="/title/"]"#))
    else {
        return Vec::new();
    };
    let Some(anchor) = doc.select(&anchor_sel).next() else {
        return Vec::new();
    };

    let mut ids = Vec::new();
    for sibling in anchor.next_siblings().filter_map(ElementRef::wrap) {
        let element = sibling.value();
        if element.name() == "a" && element.attr("name").is_some() {
            break;
        }
        if element.name() != "div" {
            continue;
        }
        if let Some(id) = sibling
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(title_id_from_href)
        {
            ids.push(id);
        }
    }
    ids
}

/// `/title/tt0058461/?ref_=ttcnn` → `tt0058461`
fn title_id_from_href(href: &str) -> Option<TitleId> {
    let mut parts = href.split('/');
    if parts.nth(1) != Some("title") {
        return None;
    }
    parts.next().and_then(|raw| raw.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_redis_client;
    use crate::services::providers::MemoProvider;
    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LEGACY_PAGE: &str = r##"
        <html><body>
        <select id="jumpto">
            <option value="#follows">Follows (1)</option>
            <option value="#followed_by">Followed by (7)</option>
            <option value="#references">References (40)</option>
        </select>
        <a name="follows"></a>
        <h4 class="li_group">Follows</h4>
        <div class="soda odd"><a href="/title/tt0076759/">Star Wars</a> (1977)</div>
        <a name="followed_by"></a>
        <h4 class="li_group">Followed by</h4>
        <div class="soda odd"><a href="/title/tt0086190/">Return of the Jedi</a> (1983)</div>
        <div class="soda even"><a href="/title/tt2488496/">The Force Awakens</a> (2015)</div>
        <div class="soda odd"><a href="/title/tt0121766/">Revenge of the Sith</a> (2005)</div>
        <div class="soda even"><a href="/title/tt0120915/">The Phantom Menace</a> (1999)</div>
        <div class="soda odd"><a href="/title/tt0121765/">Attack of the Clones</a> (2002)</div>
        <div class="soda even"><a href="/title/tt2527336/">The Last Jedi</a> (2017)</div>
        <a name="references"></a>
        <h4 class="li_group">References</h4>
        <div class="soda odd"><a href="/title/tt0015881/">Greed</a> (1924)</div>
        </body></html>
    "##;

    const CURRENT_PAGE: &str = r##"
        <html><body>
        <select><option value="#follows">Follows (2)</option></select>
        <section data-testid="sub-section-follows">
            <ul>
                <li><a href="/title/tt0058461/?ref_=ttcnn_1">A Fistful of Dollars</a></li>
                <li><a href="/title/tt0059578/?ref_=ttcnn_2">For a Few Dollars More</a></li>
                <li><a href="/title/tt0059578/?ref_=ttcnn_2b">For a Few Dollars More</a></li>
                <li><a href="/title/tt0060196/">self link</a></li>
            </ul>
        </section>
        </body></html>
    "##;

    fn id(raw: &str) -> TitleId {
        raw.parse().unwrap()
    }

    fn test_config(base_url: &str) -> Config {
        envy::from_iter::<_, Config>(vec![
            ("BASICS_PATH".to_string(), "/dev/null".to_string()),
            ("RATINGS_PATH".to_string(), "/dev/null".to_string()),
            ("CONNECTIONS_BASE_URL".to_string(), base_url.to_string()),
            ("MIN_REQUEST_INTERVAL_MS".to_string(), "0".to_string()),
        ])
        .unwrap()
    }

    #[test]
    fn test_parse_legacy_page_counts() {
        let page = parse_connections_page(&id("tt0080684"), LEGACY_PAGE);
        assert_eq!(page.follows_count, 1);
        assert_eq!(page.followed_by_count, 7);
    }

    #[test]
    fn test_parse_legacy_page_links_stop_at_next_section() {
        let page = parse_connections_page(&id("tt0080684"), LEGACY_PAGE);
        assert_eq!(page.follows, vec![id("tt0076759")]);
        assert_eq!(page.followed_by.len(), 6);
        assert_eq!(page.followed_by[0], id("tt0086190"));
        assert!(!page.followed_by.contains(&id("tt0015881")));
    }

    #[test]
    fn test_parse_current_page_dedups_and_drops_self_link() {
        let page = parse_connections_page(&id("tt0060196"), CURRENT_PAGE);
        assert_eq!(page.follows_count, 2);
        assert_eq!(page.follows, vec![id("tt0058461"), id("tt0059578")]);
        assert_eq!(page.followed_by_count, 0);
        assert!(page.followed_by.is_empty());
    }

    #[test]
    fn test_unparseable_count_degrades_to_zero() {
        let html = r##"<select><option value="#follows">Follows (many)</option></select>"##;
        let page = parse_connections_page(&id("tt0000001"), html);
        assert_eq!(page.follows_count, 0);
    }

    #[test]
    fn test_count_with_thousands_separator() {
        let html = r##"<select><option value="#followed_by">Followed by (1,024)</option></select>"##;
        let page = parse_connections_page(&id("tt0000001"), html);
        assert_eq!(page.followed_by_count, 1024);
    }

    #[test]
    fn test_title_id_from_href() {
        assert_eq!(title_id_from_href("/title/tt0058461/?ref_=x"), Some(id("tt0058461")));
        assert_eq!(title_id_from_href("/title/tt0058461"), Some(id("tt0058461")));
        assert_eq!(title_id_from_href("/name/nm0000123/"), None);
        assert_eq!(title_id_from_href("/title/"), None);
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn offline_cache() -> Cache {
        Cache::new(create_redis_client("redis://127.0.0.1:1").unwrap()).0
    }

    #[tokio::test]
    async fn test_provider_caps_disclosure_over_http() {
        let router = Router::new().route(
            "/title/:id/movieconnections/",
            get(|Path(_id): Path<String>| async { axum::response::Html(LEGACY_PAGE) }),
        );
        let base_url = serve(router).await;
        let provider = ImdbConnectionProvider::new(&test_config(&base_url), offline_cache()).unwrap();

        let seed = id("tt0080684");
        assert_eq!(provider.link_count(&seed, Direction::Backward).await.unwrap(), 7);

        let batch = provider.next_batch(&seed, Direction::Backward).await.unwrap();
        assert_eq!(batch.anchor, seed);
        assert_eq!(batch.ids.len(), 5);
        assert_eq!(batch.last(), Some(&id("tt0121765")));
    }

    #[tokio::test]
    async fn test_page_fetched_once_for_all_calls_on_a_title() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/title/:id/movieconnections/",
            get(move |Path(_id): Path<String>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::response::Html(LEGACY_PAGE)
                }
            }),
        );
        let base_url = serve(router).await;
        let provider = ImdbConnectionProvider::new(&test_config(&base_url), offline_cache()).unwrap();
        let memo = MemoProvider::new(&provider);

        let seed = id("tt0080684");
        for direction in Direction::ALL {
            memo.link_count(&seed, direction).await.unwrap();
            memo.next_batch(&seed, direction).await.unwrap();
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(memo.upstream_calls(), 4);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_remembered() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/title/:id/movieconnections/",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::SERVICE_UNAVAILABLE
                }
            }),
        );
        let base_url = serve(router).await;
        let provider = ImdbConnectionProvider::new(&test_config(&base_url), offline_cache()).unwrap();

        let seed = id("tt0080684");
        assert!(provider.link_count(&seed, Direction::Forward).await.is_err());
        assert!(provider.link_count(&seed, Direction::Forward).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_provider_reports_rate_limit() {
        let router = Router::new().route(
            "/title/:id/movieconnections/",
            get(|| async { AxumStatus::TOO_MANY_REQUESTS }),
        );
        let base_url = serve(router).await;
        let provider = ImdbConnectionProvider::new(&test_config(&base_url), offline_cache()).unwrap();

        let result = provider.link_count(&id("tt0080684"), Direction::Forward).await;
        assert_eq!(result, Err(ProviderError::RateLimited("tt0080684".to_string())));
    }

    #[tokio::test]
    async fn test_provider_reports_server_error_as_unavailable() {
        let router = Router::new().route(
            "/title/:id/movieconnections/",
            get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }),
        );
        let base_url = serve(router).await;
        let provider = ImdbConnectionProvider::new(&test_config(&base_url), offline_cache()).unwrap();

        let result = provider.next_batch(&id("tt0080684"), Direction::Forward).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let mut limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait_turn().await;
        limiter.wait_turn().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
