use std::{
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use aliri_base64::Base64UrlRef;
use medboard_tokens::{Credentials, TokenStore};
use reqwest::{header, Method, Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next, Result};
use serde_json::{json, Value};

use crate::{AdminClient, ClientConfig};

pub const BASE: &str = "https://clinic.example.com/api";
pub const PASSWORD: &str = "correct horse";

/// An in-process admin backend
///
/// Access tokens are minted as unsigned JWTs that expire far in the future,
/// refresh tokens as `refresh-N`. Only the most recently minted access token
/// is accepted by business endpoints.
#[derive(Default)]
pub struct Backend {
    minted: AtomicUsize,
    valid: Mutex<Option<(String, String)>>,
    pub reject_refresh: AtomicBool,
    pub fail_logout: AtomicBool,
    pub blank_tokens: AtomicBool,
    pub refuse_uploads: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub log: Mutex<Vec<String>>,
}

impl Backend {
    /// The access token minted for the `n`th session
    pub fn access_token(n: usize) -> String {
        let header = Base64UrlRef::from_slice(br#"{"alg":"HS256","typ":"JWT"}"#).to_string();
        let claims = json!({ "sub": "admin", "jti": n, "exp": 4_102_444_800u64 });
        let payload = Base64UrlRef::from_slice(claims.to_string().as_bytes()).to_string();
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    /// Mints a session without going through login
    pub fn mint(&self) -> Credentials {
        let n = self.minted.fetch_add(1, Ordering::AcqRel) + 1;
        let access = Self::access_token(n);
        let refresh = format!("refresh-{n}");
        *self.valid.lock().unwrap() = Some((access.clone(), refresh.clone()));
        Credentials::new(access).with_refresh_token(refresh)
    }

    /// Invalidates the current access token but keeps its refresh token
    pub fn expire_access_token(&self) {
        if let Some((access, _)) = self.valid.lock().unwrap().as_mut() {
            access.push_str("-revoked");
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::Acquire)
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn is_authorized(&self, req: &Request) -> bool {
        let valid = self.valid.lock().unwrap();
        let presented = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        match (valid.as_ref(), presented) {
            (Some((access, _)), Some(presented)) => presented == format!("Bearer {access}"),
            _ => false,
        }
    }

    fn tokens(&self, credentials: &Credentials) -> Response {
        if self.blank_tokens.load(Ordering::Acquire) {
            return json_response(StatusCode::OK, json!({ "accessToken": "", "refreshToken": "" }));
        }
        json_response(
            StatusCode::OK,
            json!({
                "accessToken": credentials.access_token().as_str(),
                "refreshToken": credentials.refresh_token().map(|r| r.as_str()),
                "tokenType": "Bearer",
            }),
        )
    }

    fn login(&self, body: Value) -> Response {
        if body["password"] == PASSWORD {
            let credentials = self.mint();
            self.tokens(&credentials)
        } else {
            respond(StatusCode::UNAUTHORIZED, "bad credentials")
        }
    }

    fn refresh(&self, body: Value) -> Response {
        self.refresh_calls.fetch_add(1, Ordering::AcqRel);
        let expected = self.valid.lock().unwrap().as_ref().map(|(_, r)| r.clone());
        if self.reject_refresh.load(Ordering::Acquire)
            || expected.is_none()
            || body["refreshToken"].as_str() != expected.as_deref()
        {
            return respond(StatusCode::UNAUTHORIZED, "");
        }
        let credentials = self.mint();
        self.tokens(&credentials)
    }

    fn business(&self, req: &Request, segments: &[&str]) -> Response {
        let multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        match (req.method().clone(), segments) {
            (Method::GET, ["directions"]) => page(req, json!([direction(1), direction(2)])),
            (Method::GET, ["doctors"]) => page(req, json!([doctor(1)])),
            (Method::GET, ["reviews"]) => page(
                req,
                json!([{ "id": 5, "name": "Ivan", "phone": "+998901234567", "message": "Thank you", "createdAt": "2024-05-01T10:00:00" }]),
            ),
            (Method::GET, ["directions", "404"] | ["doctors", "404"]) => {
                respond(StatusCode::NOT_FOUND, "not found")
            }
            (Method::GET, ["directions", "garbled"]) => respond(StatusCode::OK, "{"),
            (Method::GET, ["directions", id]) => {
                json_response(StatusCode::OK, direction(id.parse().unwrap_or_default()))
            }
            (Method::GET, ["doctors", id]) => {
                json_response(StatusCode::OK, doctor(id.parse().unwrap_or_default()))
            }
            (Method::POST | Method::PUT, _) if self.refuse_uploads.load(Ordering::Acquire) => {
                respond(StatusCode::UNAUTHORIZED, "uploads are not allowed")
            }
            (Method::POST | Method::PUT, ["directions", ..]) if multipart => {
                json_response(StatusCode::OK, direction(7))
            }
            (Method::POST | Method::PUT, ["doctors", ..]) if multipart => {
                json_response(StatusCode::OK, doctor(7))
            }
            (Method::DELETE, [_, _]) => respond(StatusCode::NO_CONTENT, ""),
            _ => respond(StatusCode::BAD_REQUEST, "unexpected request"),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for Backend {
    async fn handle(
        &self,
        req: Request,
        _: &mut http::Extensions,
        _: Next<'_>,
    ) -> Result<Response> {
        let path = req.url().path().trim_start_matches("/api/").to_owned();
        self.log
            .lock()
            .unwrap()
            .push(format!("{} {}", req.method(), path));

        let body: Value = req
            .body()
            .and_then(|b| b.as_bytes())
            .and_then(|b| serde_json::from_slice(b).ok())
            .unwrap_or(Value::Null);

        let segments: Vec<&str> = path.split('/').collect();
        let resp = match segments.as_slice() {
            ["auth", "login"] => self.login(body),
            ["auth", "refresh-token"] => self.refresh(body),
            ["auth", "logout"] => {
                self.logout_calls.fetch_add(1, Ordering::AcqRel);
                if self.fail_logout.load(Ordering::Acquire) {
                    return Err(reqwest_middleware::Error::middleware(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset",
                    )));
                }
                respond(StatusCode::NO_CONTENT, "")
            }
            ["slow"] => {
                return Err(reqwest_middleware::Error::middleware(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "operation timed out",
                )))
            }
            _ if !self.is_authorized(&req) => respond(StatusCode::UNAUTHORIZED, ""),
            segments => self.business(&req, segments),
        };
        Ok(resp)
    }
}

fn page(req: &Request, content: Value) -> Response {
    let query: Vec<(String, String)> = req.url().query_pairs().into_owned().collect();
    let param = |name: &str| {
        query
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.parse::<u32>().ok())
            .unwrap_or_default()
    };
    json_response(
        StatusCode::OK,
        json!({
            "content": content,
            "page": { "size": param("size"), "number": param("page"), "totalElements": 21, "totalPages": 3 },
        }),
    )
}

fn direction(id: u64) -> Value {
    json!({
        "id": id,
        "directionImage": format!("/images/directions/{id}.png"),
        "translations": [
            { "languageCode": "ru", "title": "Кардиология", "description": "Сердце" },
            { "languageCode": "en", "title": "Cardiology", "description": "Heart" },
        ],
    })
}

fn doctor(id: u64) -> Value {
    json!({
        "id": id,
        "firstName": "Anna",
        "lastName": "Petrova",
        "middleName": "Ivanovna",
        "profileImage": null,
        "translations": [{ "languageCode": "en", "specialization": "Cardiologist" }],
    })
}

pub fn respond(status: StatusCode, body: &'static str) -> Response {
    http::Response::builder()
        .status(status)
        .body(body)
        .unwrap()
        .into()
}

fn json_response(status: StatusCode, body: Value) -> Response {
    http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
        .into()
}

pub struct Harness {
    pub client: AdminClient,
    pub backend: Arc<Backend>,
    pub redirects: Arc<AtomicUsize>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_store(TokenStore::in_memory()).await
    }

    /// A harness whose client already holds a session accepted by the backend
    pub async fn logged_in() -> Self {
        let harness = Self::new().await;
        let credentials = harness.backend.mint();
        harness.client.coordinator().begin_session(credentials).await;
        harness
    }

    pub async fn with_store(store: TokenStore) -> Self {
        let backend = Arc::new(Backend::default());
        let redirects = Arc::new(AtomicUsize::new(0));
        let counter = redirects.clone();

        let client = AdminClient::builder(ClientConfig::new(BASE.parse().unwrap()))
            .with_token_store(store)
            .with_redirect(move || {
                counter.fetch_add(1, Ordering::AcqRel);
            })
            .with_transport_middleware(SharedBackend(backend.clone()))
            .build()
            .await
            .unwrap();

        Self {
            client,
            backend,
            redirects,
        }
    }

    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::Acquire)
    }
}

struct SharedBackend(Arc<Backend>);

#[async_trait::async_trait]
impl Middleware for SharedBackend {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        self.0.handle(req, extensions, next).await
    }
}
