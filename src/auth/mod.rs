//! Credential Providers
//!
//! Bearer tokens for the drive API are supplied on demand. Components ask for a
//! token before every remote call, so a token refreshed by an external sign-in
//! flow is picked up mid-run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{DepositError, Result};

/// Supplies bearer tokens for remote calls
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a currently valid bearer token
    async fn bearer_token(&self) -> Result<String>;
}

/// Fixed token, mostly useful for tests and short scripted runs
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(DepositError::Unauthenticated(
                "no bearer token configured".to_string(),
            ));
        }
        Ok(self.token.clone())
    }
}

/// Token file as written by the device-code sign-in flow
#[derive(Debug, Deserialize)]
struct TokenFile {
    access_token: Option<String>,
}

/// Reads `access_token` from a JSON token file on every call
pub struct FileTokenProvider {
    path: PathBuf,
}

impl FileTokenProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialProvider for FileTokenProvider {
    async fn bearer_token(&self) -> Result<String> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DepositError::Unauthenticated(format!(
                "cannot read token file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let file: TokenFile = serde_json::from_str(&raw).map_err(|e| {
            DepositError::Unauthenticated(format!(
                "token file '{}' is not valid JSON: {}",
                self.path.display(),
                e
            ))
        })?;

        match file.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(DepositError::Unauthenticated(format!(
                "token file '{}' does not contain an 'access_token'",
                self.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.bearer_token().await.unwrap(), "abc");

        let empty = StaticTokenProvider::new("");
        assert!(matches!(
            empty.bearer_token().await,
            Err(DepositError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_file_token_is_reread_on_each_call() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("auth-token.json");
        let provider = FileTokenProvider::new(&path);

        std::fs::write(&path, r#"{"access_token": "first", "expires_in": 3599}"#).unwrap();
        assert_eq!(provider.bearer_token().await.unwrap(), "first");

        std::fs::write(&path, r#"{"access_token": "second"}"#).unwrap();
        assert_eq!(provider.bearer_token().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_file_token_missing() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FileTokenProvider::new(temp_dir.path().join("absent.json"));

        assert!(matches!(
            provider.bearer_token().await,
            Err(DepositError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_file_token_without_access_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("auth-token.json");
        std::fs::write(&path, r#"{"error": "authorization_pending"}"#).unwrap();

        let provider = FileTokenProvider::new(&path);
        assert!(matches!(
            provider.bearer_token().await,
            Err(DepositError::Unauthenticated(_))
        ));
    }
}
