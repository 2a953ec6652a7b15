//! Marketplace client: search, download-URL request, key registration,
//! archive upload. JSON over HTTPS; plain HTTP is accepted only for
//! loopback hosts during development.

use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Result, SkillPortError};
use crate::policy::Policy;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillListing {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub risk_score: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadGrant {
    pub url: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredKey {
    pub key_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
    pub version: String,
}

pub struct MarketplaceClient {
    base_url: reqwest::Url,
    token: Option<String>,
    http: Client,
}

impl MarketplaceClient {
    /// Build a client for the configured marketplace. Rejects non-HTTPS
    /// URLs for non-loopback hosts and hosts outside the policy allowlist.
    pub fn new(config: &Config, policy: &Policy) -> Result<Self> {
        let base_url = reqwest::Url::parse(&config.marketplace_url).map_err(|e| {
            SkillPortError::InputInvalid(format!(
                "marketplace url {}: {e}",
                config.marketplace_url
            ))
        })?;

        let host = base_url
            .host_str()
            .ok_or_else(|| {
                SkillPortError::InputInvalid("marketplace url has no host".into())
            })?
            .to_string();

        let loopback = host == "localhost" || host == "127.0.0.1" || host == "::1";
        if base_url.scheme() != "https" && !loopback {
            return Err(SkillPortError::InputInvalid(format!(
                "marketplace url must use https (got {})",
                base_url.scheme()
            )));
        }

        if !policy.is_host_allowed(&host) {
            return Err(SkillPortError::PolicyRejected {
                reason: format!("host {host} is not in policy.allowed_hosts"),
                hints: vec![format!(
                    "add \"{host}\" to policy.allowed_hosts in .skillportrc"
                )],
            });
        }

        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            base_url,
            token: config.auth_token.clone(),
            http,
        })
    }

    /// Search the marketplace by SSP id or free text.
    pub fn search(&self, query: &str) -> Result<Vec<SkillListing>> {
        let url = self.endpoint("v1/skills")?;
        let request = self.authorized(self.http.get(url).query(&[("q", query)]));
        let response = request.send().map_err(transport_error)?;
        Self::parse_json(response)
    }

    /// Request a time-limited download URL for a skill.
    pub fn request_download_url(&self, ssp_id: &str) -> Result<String> {
        let url = self.endpoint(&format!("v1/skills/{ssp_id}/download"))?;
        let request = self.authorized(self.http.post(url));
        let response = request.send().map_err(transport_error)?;
        let grant: DownloadGrant = Self::parse_json(response)?;
        Ok(grant.url)
    }

    /// Fetch archive bytes from a previously granted URL.
    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .authorized(self.http.get(url))
            .send()
            .map_err(transport_error)?;
        let response = check_status(response)?;
        let bytes = response.bytes().map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    /// Register a public key (PEM + label) with the marketplace.
    pub fn register_key(&self, public_pem: &str, label: &str) -> Result<RegisteredKey> {
        let url = self.endpoint("v1/keys")?;
        let body = serde_json::json!({"public_key_pem": public_pem, "label": label});
        let response = self
            .authorized(self.http.post(url).json(&body))
            .send()
            .map_err(transport_error)?;
        Self::parse_json(response)
    }

    /// Upload a signed `.ssp` archive.
    pub fn upload(&self, archive_bytes: Vec<u8>) -> Result<UploadReceipt> {
        let url = self.endpoint("v1/skills")?;
        let response = self
            .authorized(
                self.http
                    .post(url)
                    .header("content-type", "application/octet-stream")
                    .body(archive_bytes),
            )
            .send()
            .map_err(transport_error)?;
        Self::parse_json(response)
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url> {
        self.base_url
            .join(path)
            .map_err(|e| SkillPortError::InputInvalid(format!("endpoint {path}: {e}")))
    }

    fn authorized(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let response = check_status(response)?;
        response
            .json()
            .map_err(|e| SkillPortError::Network(format!("invalid marketplace response: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> SkillPortError {
    SkillPortError::Network(err.to_string())
}

fn check_status(response: Response) -> Result<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(SkillPortError::AuthRequired(
            "marketplace rejected the request".into(),
        )),
        StatusCode::FORBIDDEN => Err(SkillPortError::Forbidden(
            "marketplace denied access".into(),
        )),
        StatusCode::NOT_FOUND => Err(SkillPortError::NotFound("no such skill".into())),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            Err(SkillPortError::RateLimited { retry_after_secs })
        }
        status => Err(SkillPortError::Network(format!(
            "marketplace returned {status}"
        ))),
    }
}
