use std::{fmt, sync::Arc};

use bytes::{BufMut, BytesMut};
use medboard_tokens::{AccessTokenRef, TokenStore};
use predicates::{prelude::*, reflection};
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

use crate::AuthEndpoints;

/// A middleware that attaches the current access token to outgoing requests
///
/// The token is read from the [`TokenStore`] on every request, so a token
/// minted by a refresh is used by every request sent after the store is
/// updated. Requests that already carry an `Authorization` header are left
/// untouched.
#[derive(Clone, Debug)]
pub struct AccessTokenMiddleware<P> {
    store: Arc<TokenStore>,
    predicate: P,
}

impl AccessTokenMiddleware<SkipCredentialEndpoints> {
    /// Constructs a new middleware from a token store
    ///
    /// By default, this middleware will not send a token to the login or
    /// refresh endpoints, which authenticate with explicit credentials or
    /// cookies only. To change this behavior, provide a custom predicate with
    /// [`with_predicate()`][Self::with_predicate()].
    pub fn new(store: Arc<TokenStore>, endpoints: AuthEndpoints) -> Self {
        Self {
            store,
            predicate: SkipCredentialEndpoints::new(endpoints),
        }
    }
}

impl<P> AccessTokenMiddleware<P> {
    /// Replaces the default predicate with a custom predicate
    pub fn with_predicate<Q>(self, predicate: Q) -> AccessTokenMiddleware<Q> {
        AccessTokenMiddleware {
            store: self.store,
            predicate,
        }
    }

    fn current_authorization(&self) -> Option<header::HeaderValue> {
        let token = self.store.access_token()?;
        tracing::trace!(
            token.status = ?self.store.status(),
            "obtained access token"
        );
        Some(bearer_header(&token))
    }
}

/// Builds a sensitive `Authorization: Bearer` header value
///
/// A token containing bytes that are not allowed in a header yields an empty
/// value, which the server will refuse.
pub fn bearer_header(token: &AccessTokenRef) -> header::HeaderValue {
    let mut header_value = BytesMut::with_capacity(token.as_str().len() + 7);
    header_value.put_slice(b"Bearer ");
    header_value.put_slice(token.as_str().as_bytes());
    let mut value = header::HeaderValue::from_maybe_shared(header_value.freeze())
        .unwrap_or_else(|_| {
            tracing::warn!("access token contains bytes not allowed in a header");
            header::HeaderValue::from_static("")
        });
    value.set_sensitive(true);
    value
}

#[async_trait::async_trait]
impl<P> Middleware for AccessTokenMiddleware<P>
where
    P: Predicate<Request> + Send + Sync + 'static,
{
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if self.predicate.eval(&req) {
            if let header::Entry::Vacant(entry) = req.headers_mut().entry(header::AUTHORIZATION) {
                if let Some(value) = self.current_authorization() {
                    entry.insert(value);
                }
            }
        } else {
            tracing::trace!(url = %req.url(), "not attaching access token");
        }

        next.run(req, extensions).await
    }
}

/// Attach an access token unless the request targets the login or refresh endpoint
#[derive(Clone, Debug)]
pub struct SkipCredentialEndpoints {
    endpoints: AuthEndpoints,
}

impl SkipCredentialEndpoints {
    /// Constructs a new predicate from the endpoint set
    pub fn new(endpoints: AuthEndpoints) -> Self {
        Self { endpoints }
    }
}

impl Predicate<Request> for SkipCredentialEndpoints {
    #[inline]
    fn eval(&self, req: &Request) -> bool {
        !self.endpoints.is_login(req.url()) && !self.endpoints.is_refresh(req.url())
    }

    fn find_case(&self, expected: bool, req: &Request) -> Option<reflection::Case> {
        let result = self.eval(req);
        if result != expected {
            Some(
                reflection::Case::new(Some(self), result).add_product(reflection::Product::new(
                    "path",
                    req.url().path().to_owned(),
                )),
            )
        } else {
            None
        }
    }
}

impl reflection::PredicateReflection for SkipCredentialEndpoints {}
impl fmt::Display for SkipCredentialEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("path not in {")?;
        f.write_str(self.endpoints.login().path())?;
        f.write_str(", ")?;
        f.write_str(self.endpoints.refresh().path())?;
        f.write_str("}")
    }
}
