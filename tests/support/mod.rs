//! Shared fakes for the workspace behavior tests.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokenscope_core::{
    AssetCatalog, BirdeyeAdapter, CodexAdapter, CoingeckoAdapter, HttpClient, HttpError,
    HttpRequest, HttpResponse, ProviderPolicy, TokenId,
};

pub const CODEX_URL: &str = "https://codex.test/graphql";
pub const BIRDEYE_URL: &str = "https://birdeye.test";
pub const COINGECKO_URL: &str = "https://coingecko.test";

#[derive(Debug, Clone)]
enum Reply {
    Respond(Result<HttpResponse, HttpError>),
    Stall,
}

#[derive(Debug, Clone)]
struct Route {
    needles: Vec<String>,
    reply: Reply,
}

/// HTTP fake that answers by matching substrings of the URL and body.
///
/// Routes are checked in registration order; a route matches when every
/// needle occurs in `url + body`. Unmatched requests fail as non-retryable.
#[derive(Debug, Default)]
pub struct RoutedHttpClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, needles: &[&str], reply: Reply) {
        self.routes
            .lock()
            .expect("routes should not be poisoned")
            .push(Route {
                needles: needles.iter().map(|needle| (*needle).to_owned()).collect(),
                reply,
            });
    }

    pub fn json(&self, needles: &[&str], body: Value) {
        self.push(needles, Reply::Respond(Ok(HttpResponse::ok_json(body.to_string()))));
    }

    pub fn status(&self, needles: &[&str], status: u16) {
        self.push(
            needles,
            Reply::Respond(Ok(HttpResponse::with_status(status, "upstream error"))),
        );
    }

    pub fn stall(&self, needles: &[&str]) {
        self.push(needles, Reply::Stall);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("requests should not be poisoned")
            .clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| haystack(request).contains(needle))
            .count()
    }
}

fn haystack(request: &HttpRequest) -> String {
    format!("{} {}", request.url, request.body.as_deref().unwrap_or_default())
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let text = haystack(&request);
        self.requests
            .lock()
            .expect("requests should not be poisoned")
            .push(request);

        let reply = self
            .routes
            .lock()
            .expect("routes should not be poisoned")
            .iter()
            .find(|route| route.needles.iter().all(|needle| text.contains(needle.as_str())))
            .map(|route| route.reply.clone());

        Box::pin(async move {
            match reply {
                Some(Reply::Respond(response)) => response,
                Some(Reply::Stall) => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Err(HttpError::new("stalled request gave up"))
                }
                None => Err(HttpError::non_retryable("no route for request")),
            }
        })
    }
}

pub fn token(raw: &str) -> TokenId {
    TokenId::parse(raw).expect("valid token")
}

pub fn catalog() -> Arc<AssetCatalog> {
    Arc::new(AssetCatalog::builtin())
}

pub fn codex(http: Arc<RoutedHttpClient>) -> CodexAdapter {
    CodexAdapter::new(
        http,
        "codex-test-key",
        catalog(),
        ProviderPolicy::codex_default().without_backoff(),
        64,
    )
    .with_endpoint(CODEX_URL)
}

pub fn birdeye(http: Arc<RoutedHttpClient>) -> BirdeyeAdapter {
    BirdeyeAdapter::new(
        http,
        "birdeye-test-key",
        catalog(),
        ProviderPolicy::birdeye_default().without_backoff(),
        64,
    )
    .with_base_url(BIRDEYE_URL)
}

pub fn coingecko(http: Arc<RoutedHttpClient>) -> CoingeckoAdapter {
    CoingeckoAdapter::new(
        http,
        None,
        catalog(),
        ProviderPolicy::coingecko_default().without_backoff(),
        64,
    )
    .with_base_url(COINGECKO_URL)
}
