//! Signed HTTP client for the lookup endpoint

use std::time::SystemTime;

use async_trait::async_trait;
use aws_credential_types::provider::SharedCredentialsProvider;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

use super::sigv4::Signer;
use super::{LookupItem, Registrar};
use crate::config::LookupConfig;
use crate::error::{DepositError, Result, Step};
use crate::store::ensure_success;

const JSON: &str = "application/json";

pub struct LookupClient {
    http: reqwest::Client,
    endpoint: Url,
    signer: Signer,
}

impl LookupClient {
    pub fn new(
        http: reqwest::Client,
        config: &LookupConfig,
        credentials: SharedCredentialsProvider,
    ) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            DepositError::Signing(format!("invalid lookup endpoint '{}': {}", config.endpoint, e))
        })?;

        Ok(Self {
            http,
            endpoint,
            signer: Signer::new(credentials, &config.region, &config.service),
        })
    }
}

#[async_trait]
impl Registrar for LookupClient {
    async fn register(&self, item: &LookupItem) -> Result<()> {
        let step = Step::RegisterLookup;
        let body = serde_json::to_vec(item).map_err(|e| DepositError::remote(step, e))?;
        let signed = self
            .signer
            .sign("POST", &self.endpoint, JSON, &body, SystemTime::now())
            .await?;

        tracing::debug!(
            artefact_id = %item.artefact_id,
            media_type = %item.media_type,
            origin_uri = %item.origin_uri,
            "Registering lookup item"
        );

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON)
            .header("x-amz-date", &signed.amz_date)
            .header(reqwest::header::AUTHORIZATION, &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| DepositError::remote(step, e))?;
        ensure_success(step, response).await?;

        tracing::info!(artefact_id = %item.artefact_id, "Lookup item registered");
        Ok(())
    }
}
