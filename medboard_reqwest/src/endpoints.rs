use reqwest::Url;

/// The backend's authentication endpoints
///
/// These endpoints are treated specially by the middleware: the login and
/// refresh endpoints never receive a bearer token, a 401 from the login
/// endpoint is a plain answer, and a 401 from the refresh endpoint ends the
/// session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthEndpoints {
    login: Url,
    refresh: Url,
    logout: Url,
}

impl AuthEndpoints {
    /// Path of the login endpoint relative to the API base
    pub const LOGIN_PATH: &'static str = "auth/login";
    /// Path of the refresh endpoint relative to the API base
    pub const REFRESH_PATH: &'static str = "auth/refresh-token";
    /// Path of the logout endpoint relative to the API base
    pub const LOGOUT_PATH: &'static str = "auth/logout";

    /// Resolves the default endpoint paths against the API base URL
    ///
    /// The base is treated as a directory whether or not it ends in `/`.
    pub fn from_base(base: &Url) -> Result<Self, url::ParseError> {
        let base = directory_url(base);
        Ok(Self {
            login: base.join(Self::LOGIN_PATH)?,
            refresh: base.join(Self::REFRESH_PATH)?,
            logout: base.join(Self::LOGOUT_PATH)?,
        })
    }

    /// The login endpoint
    #[inline]
    pub fn login(&self) -> &Url {
        &self.login
    }

    /// The refresh endpoint
    #[inline]
    pub fn refresh(&self) -> &Url {
        &self.refresh
    }

    /// The logout endpoint
    #[inline]
    pub fn logout(&self) -> &Url {
        &self.logout
    }

    /// Whether `url` addresses the login endpoint
    pub fn is_login(&self, url: &Url) -> bool {
        same_endpoint(&self.login, url)
    }

    /// Whether `url` addresses the refresh endpoint
    pub fn is_refresh(&self, url: &Url) -> bool {
        same_endpoint(&self.refresh, url)
    }
}

/// Ensures a base URL ends with `/` so that relative joins append to it
pub fn directory_url(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn same_endpoint(endpoint: &Url, url: &Url) -> bool {
    endpoint.scheme() == url.scheme()
        && endpoint.host_str() == url.host_str()
        && endpoint.port_or_known_default() == url.port_or_known_default()
        && endpoint.path().trim_end_matches('/') == url.path().trim_end_matches('/')
}
