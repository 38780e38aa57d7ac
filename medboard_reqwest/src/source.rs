use medboard_tokens::{Credentials, RefreshError, RefreshSource};
use reqwest::{StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};

use crate::dto::{RefreshRequest, TokenResponse};

/// How the refresh credential reaches the refresh endpoint
///
/// A backend uses exactly one of these trust models.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshCredentialMode {
    /// The client stores the refresh token and sends it as `{"refreshToken": …}`
    #[default]
    Body,
    /// The server keeps the refresh token in an HttpOnly cookie; the request body is empty
    Cookie,
}

/// A refresh source that calls the backend's refresh endpoint
///
/// The client given to this source must not carry the
/// [`TokenRefreshMiddleware`][crate::TokenRefreshMiddleware]; refresh calls
/// are made outside the pipeline they serve. In cookie mode, it must share
/// its cookie store with the client used to log in.
#[derive(Clone, Debug)]
pub struct HttpRefreshSource {
    client: ClientWithMiddleware,
    url: Url,
    mode: RefreshCredentialMode,
}

impl HttpRefreshSource {
    /// Constructs a new refresh source
    pub fn new(client: ClientWithMiddleware, url: Url, mode: RefreshCredentialMode) -> Self {
        Self { client, url, mode }
    }
}

#[async_trait::async_trait]
impl RefreshSource for HttpRefreshSource {
    #[tracing::instrument(
        err,
        skip(self, current),
        fields(
            refresh_url = %self.url,
            mode = ?self.mode,
        ),
    )]
    async fn refresh(&self, current: Option<&Credentials>) -> Result<Credentials, RefreshError> {
        tracing::trace!("requesting fresh credentials");

        let req = self.client.post(self.url.clone());
        let req = match self.mode {
            RefreshCredentialMode::Body => {
                let refresh_token = current
                    .and_then(Credentials::refresh_token)
                    .ok_or(RefreshError::MissingRefreshToken)?;
                req.json(&RefreshRequest { refresh_token })
            }
            RefreshCredentialMode::Cookie => req,
        };

        let resp = req.send().await.map_err(RefreshError::transport)?;

        tracing::debug!(
            response.status = resp.status().as_u16(),
            "received refresh response"
        );

        match resp.status() {
            StatusCode::UNAUTHORIZED => return Err(RefreshError::Rejected),
            status if !status.is_success() => {
                return Err(RefreshError::Status {
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let body = resp.bytes().await.map_err(RefreshError::transport)?;
        let resp: TokenResponse = serde_json::from_slice(&body)
            .map_err(|err| RefreshError::MalformedResponse(err.to_string()))?;

        tracing::info!(
            has_refresh_token = resp.refresh_token.is_some(),
            "received new access token"
        );

        Ok(resp.into())
    }
}
