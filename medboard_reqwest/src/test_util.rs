use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use medboard_tokens::{Credentials, RefreshCoordinator, TokenStore};
use reqwest::{header, Client, Request, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next, Result};
use tokio::sync::Semaphore;

use crate::{
    AccessTokenMiddleware, AuthEndpoints, HttpRefreshSource, RefreshCredentialMode,
    TokenRefreshMiddleware,
};

pub const BASE: &str = "https://clinic.example.com/api/";
pub const OLD_TOKEN: &str = "oldToken";
pub const OLD_REFRESH: &str = "oldRefresh";
pub const NEW_TOKEN: &str = "newToken";
pub const NEW_REFRESH: &str = "newRefresh";

pub fn endpoints() -> AuthEndpoints {
    AuthEndpoints::from_base(&BASE.parse().unwrap()).unwrap()
}

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

/// A stand-in for the admin backend
///
/// Business endpoints answer 401 unless they receive `Bearer newToken`, or
/// always when told to refuse every token. The refresh endpoint mints
/// `newToken` unless told to reject the session.
#[derive(Default)]
pub struct MockBackend {
    pub refresh_calls: AtomicUsize,
    pub reject_refresh: AtomicBool,
    pub refuse_all_tokens: AtomicBool,
    pub refresh_gate: Option<Semaphore>,
    pub seen: Mutex<Vec<(String, Option<String>)>>,
    pub refresh_bodies: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn gated() -> Self {
        Self {
            refresh_gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn rejecting_refresh() -> Self {
        let backend = Self::default();
        backend.reject_refresh.store(true, Ordering::Release);
        backend
    }

    pub fn business_requests(&self) -> Vec<(String, Option<String>)> {
        self.seen.lock().unwrap().clone()
    }

    async fn handle_refresh(&self, req: &Request) -> Response {
        self.refresh_calls.fetch_add(1, Ordering::AcqRel);
        let body = req
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        self.refresh_bodies.lock().unwrap().push(body);

        if let Some(gate) = &self.refresh_gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.reject_refresh.load(Ordering::Acquire) {
            return respond(StatusCode::UNAUTHORIZED, "");
        }

        let body = serde_json::json!({
            "accessToken": NEW_TOKEN,
            "refreshToken": NEW_REFRESH,
        });
        respond(StatusCode::OK, body.to_string())
    }
}

pub fn respond(status: StatusCode, body: impl Into<reqwest::Body>) -> Response {
    http::Response::builder()
        .status(status)
        .body(body.into())
        .unwrap()
        .into()
}

#[async_trait::async_trait]
impl Middleware for MockBackend {
    async fn handle(
        &self,
        req: Request,
        _: &mut http::Extensions,
        _: Next<'_>,
    ) -> Result<Response> {
        let path = req.url().path().to_owned();
        if path == "/api/auth/refresh-token" {
            return Ok(self.handle_refresh(&req).await);
        }
        if path == "/api/unreachable" {
            return Err(reqwest_middleware::Error::middleware(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        if path == "/api/broken" {
            return Ok(respond(StatusCode::INTERNAL_SERVER_ERROR, "boom"));
        }

        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .map(|v| v.to_str().unwrap().to_owned());
        self.seen
            .lock()
            .unwrap()
            .push((path.clone(), authorization.clone()));

        if path == "/api/auth/login" {
            return Ok(respond(StatusCode::UNAUTHORIZED, "bad credentials"));
        }

        let refused = self.refuse_all_tokens.load(Ordering::Acquire);
        if !refused && authorization.as_deref() == Some("Bearer newToken") {
            Ok(respond(StatusCode::OK, "ok"))
        } else {
            Ok(respond(StatusCode::UNAUTHORIZED, ""))
        }
    }
}

pub struct Harness {
    pub client: ClientWithMiddleware,
    pub coordinator: Arc<RefreshCoordinator>,
    pub backend: Arc<MockBackend>,
    pub redirects: Arc<AtomicUsize>,
}

impl Harness {
    pub async fn new(backend: MockBackend) -> Self {
        let backend = Arc::new(backend);
        let store = Arc::new(TokenStore::in_memory());
        store
            .set(Credentials::new(OLD_TOKEN).with_refresh_token(OLD_REFRESH))
            .await;

        let refresh_client = ClientBuilder::new(Client::default())
            .with_arc(backend.clone())
            .build();
        let source = HttpRefreshSource::new(
            refresh_client,
            endpoints().refresh().clone(),
            RefreshCredentialMode::Body,
        );

        let redirects = Arc::new(AtomicUsize::new(0));
        let counter = redirects.clone();
        let coordinator = Arc::new(
            RefreshCoordinator::new(store.clone(), source).with_redirect(move || {
                counter.fetch_add(1, Ordering::AcqRel);
            }),
        );

        let client = ClientBuilder::new(Client::default())
            .with(TokenRefreshMiddleware::new(
                coordinator.clone(),
                endpoints(),
            ))
            .with(AccessTokenMiddleware::new(store, endpoints()))
            .with_arc(backend.clone())
            .build();

        Self {
            client,
            coordinator,
            backend,
            redirects,
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        self.coordinator.store()
    }

    pub fn refresh_calls(&self) -> usize {
        self.backend.refresh_calls.load(Ordering::Acquire)
    }

    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::Acquire)
    }
}
