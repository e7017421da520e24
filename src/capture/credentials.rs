//! Backend credentials injected into forwarded requests.

use axum::http::header::{InvalidHeaderValue, AUTHORIZATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::AuthConfig;

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Header carrying the organization id.
pub static ORGANIZATION_HEADER: HeaderName = HeaderName::from_static("openai-organization");

/// Header values resolved once at startup.
#[derive(Clone, Default)]
pub struct Credentials {
    bearer: Option<HeaderValue>,
    organization: Option<HeaderValue>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("organization", &self.organization)
            .finish()
    }
}

impl Credentials {
    /// Resolve from the `[auth]` section and the environment key, if any.
    pub fn from_config(
        auth: &AuthConfig,
        env_key: Option<&str>,
    ) -> Result<Self, InvalidHeaderValue> {
        Self::resolve(&auth.api_key, &auth.organization, env_key)
    }

    /// Resolve the effective credentials.
    ///
    /// A configured key always wins over `env_key`, silently. Empty strings
    /// count as absent.
    pub fn resolve(
        api_key: &str,
        organization: &str,
        env_key: Option<&str>,
    ) -> Result<Self, InvalidHeaderValue> {
        let key = Some(api_key)
            .filter(|key| !key.is_empty())
            .or_else(|| env_key.filter(|key| !key.is_empty()));

        let bearer = key
            .map(|key| {
                let mut value = HeaderValue::from_str(&format!("Bearer {key}"))?;
                value.set_sensitive(true);
                Ok::<_, InvalidHeaderValue>(value)
            })
            .transpose()?;

        let organization = Some(organization)
            .filter(|org| !org.is_empty())
            .map(HeaderValue::from_str)
            .transpose()?;

        Ok(Self {
            bearer,
            organization,
        })
    }

    /// Whether a bearer token will be injected.
    pub fn has_api_key(&self) -> bool {
        self.bearer.is_some()
    }

    /// Overwrite the auth headers on an outbound request.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some(bearer) = &self.bearer {
            headers.insert(AUTHORIZATION, bearer.clone());
        }
        if let Some(org) = &self.organization {
            headers.insert(ORGANIZATION_HEADER.clone(), org.clone());
        }
    }
}
