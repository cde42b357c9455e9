// Onboarding HTTP client
//
// Plain-HTTP calls used once, before a session exists: check the
// credentials and learn the unit's identity. Bodies share the
// `{ code, result }` envelope.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::codec::ResponseCode;
use crate::error::Error;
use crate::http::HttpConfig;
use crate::models::DiscoveryInfo;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: Option<String>,
    result: Option<T>,
}

/// Client for `POST /api/login` and `GET /api/discovery`.
pub struct OnboardingClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OnboardingClient {
    /// `base_url` is the unit root, e.g. `http://192.168.1.50`.
    pub fn new(base_url: Url, config: &HttpConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            base_url,
        })
    }

    /// Build a client for a bare host name or address.
    pub fn for_host(host: &str, config: &HttpConfig) -> Result<Self, Error> {
        Self::new(Url::parse(&format!("http://{host}/"))?, config)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Verify credentials. Returns the token the unit issued.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, Error> {
        let url = self.base_url.join("api/login")?;
        debug!(%url, username, "POST login");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });
        let resp = self.http.post(url).json(&body).send().await?;
        let envelope: Envelope<serde_json::Value> = Self::parse(resp).await?;

        let code = envelope.code.unwrap_or_default();
        match ResponseCode::from_wire(&code) {
            ResponseCode::Ok => match envelope.result {
                Some(serde_json::Value::String(token)) => Ok(SecretString::from(token)),
                Some(other) => Ok(SecretString::from(other.to_string())),
                None => Err(Error::Authentication {
                    message: "login accepted without a token".into(),
                }),
            },
            ResponseCode::InvalidUser => Err(Error::InvalidUser),
            other => Err(Error::Authentication {
                message: format!("unit answered {other}"),
            }),
        }
    }

    /// Fetch model, firmware version and serial numbers.
    pub async fn discovery(&self) -> Result<DiscoveryInfo, Error> {
        let url = self.base_url.join("api/discovery")?;
        debug!(%url, "GET discovery");

        let resp = self.http.get(url).send().await?;
        let envelope: Envelope<DiscoveryInfo> = Self::parse(resp).await?;

        match envelope.code.as_deref().map(ResponseCode::from_wire) {
            None | Some(ResponseCode::Ok) => Ok(envelope.result.unwrap_or_default()),
            Some(code) => Err(Error::Api {
                code: code.to_string(),
            }),
        }
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Envelope<T>, Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "unit rejected the request (HTTP 401)".into(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("HTTP {status}: {e}"),
            body,
        })
    }
}
