//! Route Classification
//! Mission: Fixed partition of request paths into public and protected
//!
//! The table is configuration, never runtime state. A path is public when it
//! matches one of the public entries exactly (ignoring a trailing slash),
//! protected otherwise.

pub const SIGN_IN_PATH: &str = "/authentication/sign-in";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const AUTHENTICATION_ROOT: &str = "/authentication";

/// Which partition a path falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Gate not applied at all (API, static assets)
    Excluded,
    /// Servable without a token; an authenticated caller is sent elsewhere
    RedirectAway,
    Public,
    Protected,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    pub api_prefix: String,
    pub excluded_prefixes: Vec<String>,
    pub public_paths: Vec<String>,
    pub redirect_away_paths: Vec<String>,
    pub sign_in_path: String,
    pub authenticated_landing: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::with_api_prefix("/api")
    }
}

impl RouteTable {
    pub fn with_api_prefix(api_prefix: &str) -> Self {
        let api_prefix = normalize(api_prefix);
        Self {
            excluded_prefixes: vec![
                api_prefix.clone(),
                "/_next/static".to_string(),
                "/_next/image".to_string(),
                "/favicon.ico".to_string(),
                "/svgs".to_string(),
                "/freelancers".to_string(),
            ],
            api_prefix,
            public_paths: vec![
                "/".to_string(),
                SIGN_IN_PATH.to_string(),
                "/authentication/sign-up".to_string(),
                "/authentication/forgot-password".to_string(),
            ],
            redirect_away_paths: vec!["/".to_string()],
            sign_in_path: SIGN_IN_PATH.to_string(),
            authenticated_landing: DASHBOARD_PATH.to_string(),
        }
    }

    pub fn is_api(&self, path: &str) -> bool {
        has_prefix(path, &self.api_prefix)
    }

    /// Paths the gate never looks at
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_prefixes.iter().any(|p| has_prefix(path, p))
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(path);
        self.public_paths.iter().any(|p| *p == path)
    }

    pub fn is_redirect_away(&self, path: &str) -> bool {
        let path = normalize(path);
        self.redirect_away_paths.iter().any(|p| *p == path)
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if self.is_excluded(path) {
            RouteClass::Excluded
        } else if self.is_redirect_away(path) {
            RouteClass::RedirectAway
        } else if self.is_public(path) {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }
}

/// Literal string prefix match, like the web framework's matcher:
/// `/api` also covers `/apiary`.
fn has_prefix(path: &str, prefix: &str) -> bool {
    path.starts_with(prefix)
}

/// `path` is `root` itself or lies below it: `/auth` covers `/auth/login`
/// but not `/authentication`
pub fn is_within(path: &str, root: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let root = root.trim_end_matches('/');
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
