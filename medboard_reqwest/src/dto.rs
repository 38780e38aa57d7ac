//! DTOs exchanged with the authentication endpoints

use medboard_tokens::{AccessToken, Credentials, Password, RefreshToken, RefreshTokenRef, Username};
use serde::{de, Deserialize, Deserializer, Serialize};

/// The body of a login request
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    /// The administrator's login name
    pub username: Username,
    /// The administrator's password
    pub password: Password,
}

/// The body of a refresh request that presents the refresh token explicitly
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    /// The refresh token held by the client
    pub refresh_token: &'a RefreshTokenRef,
}

/// Credentials issued by the login and refresh endpoints
///
/// Backends differ in field naming; both `accessToken` and `access` are
/// accepted, as are `refreshToken` and `refresh`. A blank access token is
/// refused.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// The new access token
    #[serde(alias = "access", deserialize_with = "non_blank_access_token")]
    pub access_token: AccessToken,
    /// A new refresh token, when the backend rotates it in the body
    #[serde(alias = "refresh", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,
    /// The token type, usually `Bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// The access token's lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

fn non_blank_access_token<'de, D>(deserializer: D) -> Result<AccessToken, D::Error>
where
    D: Deserializer<'de>,
{
    let token = AccessToken::deserialize(deserializer)?;
    if token.as_str().trim().is_empty() {
        return Err(de::Error::invalid_value(
            de::Unexpected::Str(token.as_str()),
            &"a non-empty access token",
        ));
    }
    Ok(token)
}

impl From<TokenResponse> for Credentials {
    fn from(resp: TokenResponse) -> Self {
        let credentials = Credentials::new(resp.access_token);
        match resp.refresh_token {
            Some(refresh_token) => credentials.with_refresh_token(refresh_token),
            None => credentials,
        }
    }
}
