//! Zoho refresh-token exchange
//!
//! A single `POST` to the accounts token endpoint with form parameters
//! `refresh_token`, `client_id`, `client_secret` and
//! `grant_type=refresh_token`. Zoho answers HTTP 200 even for a bad grant and
//! puts the reason in an `error` field, so the body is checked as well as the
//! status.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::Secret;

use crate::constants::PLACEHOLDER_ACCESS_TOKEN;
use crate::error::{Error, Result};

/// Self-client credentials used to mint access tokens.
#[derive(Debug, Clone)]
pub struct RefreshCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub refresh_token: Secret<String>,
}

impl RefreshCredentials {
    /// Assemble credentials from optional config values.
    ///
    /// Blank values count as missing. The error lists every missing part.
    pub fn from_parts(
        client_id: Option<String>,
        client_secret: Option<Secret<String>>,
        refresh_token: Option<Secret<String>>,
    ) -> Result<Self> {
        let client_id = client_id.filter(|id| !id.trim().is_empty());
        let client_secret = client_secret.filter(|s| !s.is_blank());
        let refresh_token = refresh_token.filter(|s| !s.is_blank());

        match (client_id, client_secret, refresh_token) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => Ok(Self {
                client_id,
                client_secret,
                refresh_token,
            }),
            (id, secret, refresh) => {
                let missing: Vec<&str> = [
                    (id.is_none(), "client_id"),
                    (secret.is_none(), "client_secret"),
                    (refresh.is_none(), "refresh_token"),
                ]
                .into_iter()
                .filter_map(|(absent, name)| absent.then_some(name))
                .collect();
                Err(Error::MissingCredentials(missing.join(", ")))
            }
        }
    }
}

/// Successful token endpoint answer.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// API domain bound to this token, e.g. `https://www.zohoapis.eu`
    #[serde(default)]
    pub api_domain: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    api_domain: Option<String>,
    token_type: Option<String>,
    error: Option<String>,
}

/// Exchange a refresh token for an access token.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &RefreshCredentials,
) -> Result<TokenResponse> {
    let response = client
        .post(token_url)
        .form(&[
            ("refresh_token", credentials.refresh_token.expose().as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose().as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    let raw = response
        .json::<RawTokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))?;

    if let Some(error) = raw.error {
        return Err(Error::InvalidCredentials(format!(
            "token endpoint returned error '{error}'"
        )));
    }

    let access_token = raw
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::TokenExchange("response carried no access_token".into()))?;

    Ok(TokenResponse {
        access_token,
        expires_in: raw.expires_in,
        api_domain: raw.api_domain,
        token_type: raw.token_type,
    })
}

/// Obtain an access token, or the placeholder if that is not possible.
///
/// Never fails: missing credentials and exchange errors are logged and the
/// caller continues with `PLACEHOLDER_ACCESS_TOKEN`.
pub async fn acquire_or_placeholder(
    client: &reqwest::Client,
    token_url: &str,
    credentials: Result<RefreshCredentials>,
) -> Secret<String> {
    let credentials = match credentials {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "zoho credentials incomplete, using placeholder access token");
            return Secret::from(PLACEHOLDER_ACCESS_TOKEN);
        }
    };

    match refresh_access_token(client, token_url, &credentials).await {
        Ok(token) => {
            info!(
                expires_in = token.expires_in,
                api_domain = token.api_domain.as_deref().unwrap_or("-"),
                "zoho access token obtained"
            );
            Secret::new(token.access_token)
        }
        Err(e) => {
            warn!(error = %e, "zoho token refresh failed, using placeholder access token");
            Secret::from(PLACEHOLDER_ACCESS_TOKEN)
        }
    }
}
