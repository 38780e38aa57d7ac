use std::sync::Arc;

use medboard_tokens::RefreshCoordinator;
use reqwest::{header, Request, Response, StatusCode};
use reqwest_middleware::{Error, Middleware, Next, Result};

use crate::{bearer_header, AuthEndpoints};

/// Marks a request that has already been replayed after a token refresh
///
/// A request carrying this marker never enters the refresh logic, so a
/// replay that fails authentication again surfaces its 401 to the caller
/// instead of looping. Callers may attach it up front to opt a request out of
/// refreshing entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Retried;

/// A middleware that renews the session when the backend rejects the access token
///
/// Place this middleware before [`AccessTokenMiddleware`][crate::AccessTokenMiddleware]
/// so that a replayed request passes through the authenticator again.
///
/// On a 401 response the middleware asks the [`RefreshCoordinator`] for a
/// fresh token, joining the in-flight refresh if there is one, and replays the
/// original request once with the new token. If the refresh fails, the
/// refresh error is returned as a middleware error. Any other outcome passes
/// through unchanged.
#[derive(Clone, Debug)]
pub struct TokenRefreshMiddleware {
    coordinator: Arc<RefreshCoordinator>,
    endpoints: AuthEndpoints,
}

impl TokenRefreshMiddleware {
    /// Constructs a new middleware around a refresh coordinator
    pub fn new(coordinator: Arc<RefreshCoordinator>, endpoints: AuthEndpoints) -> Self {
        Self {
            coordinator,
            endpoints,
        }
    }
}

#[async_trait::async_trait]
impl Middleware for TokenRefreshMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if extensions.get::<Retried>().is_some() || self.endpoints.is_login(req.url()) {
            return next.run(req, extensions).await;
        }

        let is_refresh_call = self.endpoints.is_refresh(req.url());
        let replay = req.try_clone();
        let method = req.method().clone();
        let url = req.url().clone();

        let response = next.clone().run(req, extensions).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if is_refresh_call {
            tracing::warn!("refresh endpoint rejected the session");
            self.coordinator.expire_session().await;
            return Ok(response);
        }

        tracing::debug!(%method, %url, "request was not authorized, refreshing access token");
        extensions.insert(Retried);

        let token = self.coordinator.refresh().await.map_err(Error::middleware)?;

        let Some(mut replay) = replay else {
            tracing::warn!(
                %method,
                %url,
                "request body cannot be replayed, returning original response"
            );
            return Ok(response);
        };

        replay
            .headers_mut()
            .insert(header::AUTHORIZATION, bearer_header(&token));

        tracing::debug!(%method, %url, "replaying request with refreshed access token");
        next.run(replay, extensions).await
    }
}
