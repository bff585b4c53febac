//! AWS Signature Version 4 request signing
//!
//! Credentials come from an AWS credentials provider and are resolved again
//! for every request, so refreshed or rotated keys are picked up mid-run.

use std::time::SystemTime;

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use reqwest::Url;

use crate::error::{DepositError, Result};

/// Headers to attach to a signed request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
    pub security_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Signer {
    credentials: SharedCredentialsProvider,
    region: String,
    service: String,
}

fn signing_error(e: impl std::fmt::Display) -> DepositError {
    DepositError::Signing(e.to_string())
}

impl Signer {
    pub fn new(
        credentials: SharedCredentialsProvider,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sign a request made at `now` with freshly resolved credentials
    pub async fn sign(
        &self,
        method: &str,
        url: &Url,
        content_type: &str,
        payload: &[u8],
        now: SystemTime,
    ) -> Result<SignedHeaders> {
        let credentials = self.credentials.provide_credentials().await.map_err(|e| {
            DepositError::Unauthenticated(format!("no AWS credentials for the lookup endpoint: {}", e))
        })?;
        self.sign_with(&credentials, method, url, content_type, payload, now)
    }

    fn sign_with(
        &self,
        credentials: &Credentials,
        method: &str,
        url: &Url,
        content_type: &str,
        payload: &[u8],
        now: SystemTime,
    ) -> Result<SignedHeaders> {
        let identity = credentials.clone().into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(&self.service)
            .time(now)
            .settings(SigningSettings::default())
            .build()
            .map_err(signing_error)?
            .into();

        let request = SignableRequest::new(
            method,
            url.as_str(),
            [("content-type", content_type)].into_iter(),
            SignableBody::Bytes(payload),
        )
        .map_err(signing_error)?;
        let (instructions, _signature) = sign(request, &params).map_err(signing_error)?.into_parts();

        let mut signed = SignedHeaders::default();
        for (name, value) in instructions.headers() {
            match name {
                "x-amz-date" => signed.amz_date = value.to_string(),
                "authorization" => signed.authorization = value.to_string(),
                "x-amz-security-token" => signed.security_token = Some(value.to_string()),
                _ => {}
            }
        }
        if signed.authorization.is_empty() {
            return Err(DepositError::Signing(
                "signer produced no authorization header".to_string(),
            ));
        }
        Ok(signed)
    }
}
