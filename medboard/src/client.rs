use std::{fmt, sync::Arc};

use medboard_reqwest::{
    bearer_header, directory_url,
    dto::{LoginRequest, TokenResponse},
    AccessTokenMiddleware, AuthEndpoints, HttpRefreshSource, RefreshCredentialMode, Retried,
    TokenRefreshMiddleware,
};
use medboard_tokens::{
    storage::FileStorage, AccessTokenRef, LoginRedirect, Password, RefreshCoordinator, TokenStore,
    Username,
};
use reqwest::{header, Method, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    api::{Directions, Doctors, Reviews},
    form::MultipartPayload,
    ApiError, ClientConfig,
};

/// A client for the clinic's admin backend
///
/// Every request goes through one shared pipeline: the current access token
/// is attached before sending, and a request rejected with `401` triggers a
/// single shared refresh and is replayed once. When the session cannot be
/// renewed, the configured [`LoginRedirect`] is invoked and the request
/// fails with [`ApiError::SessionExpired`].
#[derive(Debug)]
pub struct AdminClient {
    http: ClientWithMiddleware,
    base: Url,
    endpoints: AuthEndpoints,
    coordinator: Arc<RefreshCoordinator>,
}

impl AdminClient {
    /// Constructs a client with the default pipeline
    pub async fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::builder(config).build().await
    }

    /// Starts building a customized client
    pub fn builder(config: ClientConfig) -> AdminClientBuilder {
        AdminClientBuilder::new(config)
    }

    /// The base URL that resource paths are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// The token store holding the current session
    pub fn store(&self) -> &Arc<TokenStore> {
        self.coordinator.store()
    }

    /// The coordinator renewing the current session
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Logs in and starts a new session
    ///
    /// A rejected login is reported as [`ApiError::Http`] with status `401`
    /// and leaves any current session untouched. A response without a usable
    /// access token is reported as [`ApiError::Decode`].
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: Username, password: Password) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.endpoints.login().clone())
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let tokens: TokenResponse = read_json(resp).await?;
        tracing::info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            "logged in"
        );
        self.coordinator.begin_session(tokens.into()).await;
        Ok(())
    }

    /// Logs out
    ///
    /// The backend is notified on a best effort basis. Local credentials are
    /// cleared even if that call fails.
    pub async fn logout(&self) {
        if self.store().get().is_some() {
            let result = self
                .http
                .post(self.endpoints.logout().clone())
                .with_extension(Retried)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => tracing::debug!("logged out"),
                Ok(resp) => tracing::warn!(
                    response.status = resp.status().as_u16(),
                    "backend refused logout"
                ),
                Err(error) => tracing::warn!(
                    error = (&error as &dyn std::error::Error),
                    "unable to notify backend of logout"
                ),
            }
        }

        self.coordinator.end_session().await;
    }

    /// Renews the session now
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.coordinator
            .refresh()
            .await
            .map(drop)
            .map_err(ApiError::SessionExpired)
    }

    /// Whether a usable session is held
    ///
    /// Malformed or expired access tokens are discarded.
    pub async fn is_authenticated(&self) -> bool {
        self.store().is_authenticated().await
    }

    /// Medical directions
    pub fn directions(&self) -> Directions<'_> {
        Directions::new(self)
    }

    /// Doctors
    pub fn doctors(&self) -> Doctors<'_> {
        Doctors::new(self)
    }

    /// Patient reviews
    pub fn reviews(&self) -> Reviews<'_> {
        Reviews::new(self)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base.join(path)?;
        Ok(self.http.request(method, url))
    }

    pub(crate) async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut req = self.request(Method::GET, path)?;
        if let Some(query) = query {
            req = req.query(query);
        }
        read_json(req.send().await?).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let resp = self.request(Method::DELETE, path)?.send().await?;
        check_status(resp).await.map(drop)
    }

    /// Sends a multipart payload
    ///
    /// A multipart body cannot be replayed by the refresh middleware. If the
    /// request is refused and the session was renewed meanwhile, the form is
    /// rendered again and sent once more with the new token.
    pub(crate) async fn send_multipart<T, P>(
        &self,
        method: Method,
        path: &str,
        payload: &P,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: MultipartPayload,
    {
        let sent_with = self.store().access_token();
        let resp = self
            .multipart_request(method.clone(), path, payload, sent_with.as_deref())?
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            let current = self.store().access_token();
            if current.is_some() && current != sent_with {
                tracing::debug!(%method, path, "resending multipart request with renewed session");
                let resp = self
                    .multipart_request(method, path, payload, current.as_deref())?
                    .with_extension(Retried)
                    .send()
                    .await?;
                return read_json(resp).await;
            }
        }

        read_json(resp).await
    }

    /// Builds a multipart request bound to the given access token
    ///
    /// An explicit `Authorization` header is left in place by the pipeline.
    fn multipart_request<P: MultipartPayload>(
        &self,
        method: Method,
        path: &str,
        payload: &P,
        token: Option<&AccessTokenRef>,
    ) -> Result<RequestBuilder, ApiError> {
        let req = self.request(method, path)?.multipart(payload.to_form()?);
        Ok(match token {
            Some(token) => req.header(header::AUTHORIZATION, bearer_header(token)),
            None => req,
        })
    }
}

async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(response.status = status.as_u16(), "backend returned an error");
    Err(ApiError::Http { status, body })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let resp = check_status(resp).await?;
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(ApiError::Decode)
}

/// A builder for an [`AdminClient`]
pub struct AdminClientBuilder {
    config: ClientConfig,
    store: Option<TokenStore>,
    redirect: Option<Arc<dyn LoginRedirect>>,
    transport: Vec<Arc<dyn Middleware>>,
}

impl AdminClientBuilder {
    /// Starts from the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            store: None,
            redirect: None,
            transport: Vec::new(),
        }
    }

    /// Uses the given token store instead of one derived from the configuration
    pub fn with_token_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the action taken when the session cannot be renewed
    ///
    /// The failure is only logged by default.
    pub fn with_redirect(mut self, redirect: impl LoginRedirect + 'static) -> Self {
        self.redirect = Some(Arc::new(redirect));
        self
    }

    /// Adds a middleware below the authentication layers
    ///
    /// Transport middleware sees every request, including refresh calls,
    /// after the access token has been attached.
    pub fn with_transport_middleware(mut self, middleware: impl Middleware) -> Self {
        self.transport.push(Arc::new(middleware));
        self
    }

    /// Builds the client
    ///
    /// When a credentials file is configured and no store was given, a
    /// session saved by a previous run is restored from it.
    pub async fn build(self) -> Result<AdminClient, ApiError> {
        let base = directory_url(&self.config.base_url);
        let endpoints = AuthEndpoints::from_base(&base)?;

        let http = reqwest::Client::builder()
            .timeout(self.config.timeout())
            .cookie_store(self.config.refresh_mode == RefreshCredentialMode::Cookie)
            .build()?;

        let store = match (self.store, &self.config.credentials_file) {
            (Some(store), _) => store,
            (None, Some(path)) => TokenStore::open(FileStorage::new(path.clone())).await,
            (None, None) => TokenStore::in_memory(),
        };
        let store = Arc::new(store);

        let refresh_client = self
            .transport
            .iter()
            .fold(ClientBuilder::new(http.clone()), |b, m| b.with_arc(m.clone()))
            .build();
        let source = HttpRefreshSource::new(
            refresh_client,
            endpoints.refresh().clone(),
            self.config.refresh_mode,
        );

        let mut coordinator = RefreshCoordinator::new(store.clone(), source);
        if let Some(redirect) = self.redirect {
            coordinator = coordinator.with_redirect(move || redirect.redirect_to_login());
        }
        let coordinator = Arc::new(coordinator);

        let pipeline = ClientBuilder::new(http)
            .with(TokenRefreshMiddleware::new(
                coordinator.clone(),
                endpoints.clone(),
            ))
            .with(AccessTokenMiddleware::new(store, endpoints.clone()));
        let http = self
            .transport
            .iter()
            .fold(pipeline, |b, m| b.with_arc(m.clone()))
            .build();

        tracing::debug!(
            base_url = %base,
            refresh_mode = ?self.config.refresh_mode,
            "admin client ready"
        );

        Ok(AdminClient {
            http,
            base,
            endpoints,
            coordinator,
        })
    }
}

impl fmt::Debug for AdminClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AdminClientBuilder")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("has_redirect", &self.redirect.is_some())
            .field("transport_layers", &self.transport.len())
            .finish()
    }
}
