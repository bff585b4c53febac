//! Drive API client
//!
//! [`RemoteStore`] over the Graph drive endpoints. A bearer token is fetched
//! from the credential provider for every request.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::types::{ChunkOutcome, DriveItem, Fields, Lookup, Permission, UploadSession};
use super::{ensure_success, RemoteStore};
use crate::auth::CredentialProvider;
use crate::config::StoreConfig;
use crate::error::{DepositError, Result, Step};
use crate::transport::ByteRange;

const CONFLICT_BEHAVIOR: &str = "@microsoft.graph.conflictBehavior";

/// Paged collection wrapper used by list endpoints
#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ListItemRef {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionProgress {
    #[serde(default)]
    next_expected_ranges: Vec<String>,
}

/// Graph drive client
pub struct GraphClient {
    http: reqwest::Client,
    config: StoreConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl GraphClient {
    pub fn new(
        http: reqwest::Client,
        config: StoreConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            config,
            credentials,
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn drive_url(&self) -> String {
        format!("{}/drives/{}", self.base_url(), self.config.drive_id)
    }

    /// Start a request carrying a fresh bearer token
    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.credentials.bearer_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(&self, step: Step, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| DepositError::remote(step, e))?;
        ensure_success(step, response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, step: Step, builder: RequestBuilder) -> Result<T> {
        self.send(step, builder)
            .await?
            .json()
            .await
            .map_err(|e| DepositError::remote(step, e))
    }

    /// GET that turns a 404 into `Lookup::NotFound`
    async fn lookup(&self, step: Step, url: &str) -> Result<Lookup<DriveItem>> {
        tracing::debug!(step = %step, url = %url, "Looking up item");

        let response = self
            .request(Method::GET, url)
            .await?
            .send()
            .await
            .map_err(|e| DepositError::remote(step, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }

        let item = ensure_success(step, response)
            .await?
            .json()
            .await
            .map_err(|e| DepositError::remote(step, e))?;
        Ok(Lookup::Found(item))
    }
}

#[async_trait]
impl RemoteStore for GraphClient {
    async fn find_container(&self, name: &str) -> Result<Lookup<DriveItem>> {
        let url = format!("{}/root:/{}", self.drive_url(), urlencoding::encode(name));
        self.lookup(Step::LookupContainer, &url).await
    }

    async fn find_child(&self, parent_id: &str, name: &str) -> Result<Lookup<DriveItem>> {
        let url = format!(
            "{}/items/{}:/{}:",
            self.drive_url(),
            parent_id,
            urlencoding::encode(name)
        );
        self.lookup(Step::LookupArtefact, &url).await
    }

    async fn get_item(&self, item_id: &str) -> Result<DriveItem> {
        let url = format!("{}/items/{}", self.drive_url(), item_id);
        let builder = self.request(Method::GET, &url).await?;
        self.send_json(Step::LookupArtefact, builder).await
    }

    async fn create_container(&self, name: &str) -> Result<DriveItem> {
        let url = format!("{}/root/children", self.drive_url());
        let body = json!({
            "name": name,
            "folder": {},
            CONFLICT_BEHAVIOR: "fail",
        });

        let builder = self.request(Method::POST, &url).await?.json(&body);
        self.send_json(Step::CreateContainer, builder).await
    }

    async fn create_upload_session(&self, parent_id: &str, name: &str) -> Result<UploadSession> {
        let url = format!(
            "{}/items/{}:/{}:/createUploadSession",
            self.drive_url(),
            parent_id,
            urlencoding::encode(name)
        );
        let body = json!({ CONFLICT_BEHAVIOR: "fail" });

        let builder = self.request(Method::POST, &url).await?.json(&body);
        self.send_json(Step::OpenUploadSession, builder).await
    }

    async fn put_chunk(
        &self,
        session: &UploadSession,
        range: &ByteRange,
        bytes: Vec<u8>,
    ) -> Result<ChunkOutcome> {
        let step = Step::UploadChunk;
        let builder = self
            .request(Method::PUT, &session.upload_url)
            .await?
            .header(reqwest::header::CONTENT_RANGE, range.content_range())
            .body(bytes);

        let response = self.send(step, builder).await?;
        if response.status() == StatusCode::ACCEPTED {
            let progress: SessionProgress = response
                .json()
                .await
                .map_err(|e| DepositError::remote(step, e))?;
            return Ok(ChunkOutcome::Accepted {
                next_expected_ranges: progress.next_expected_ranges,
            });
        }

        let item = response
            .json()
            .await
            .map_err(|e| DepositError::remote(step, e))?;
        Ok(ChunkOutcome::Completed(item))
    }

    async fn set_fields(&self, item_id: &str, fields: &Fields) -> Result<()> {
        let step = Step::TagArtefact;

        let url = format!("{}/items/{}/listitem", self.drive_url(), item_id);
        let builder = self.request(Method::GET, &url).await?;
        let list_item: ListItemRef = self.send_json(step, builder).await?;

        let url = format!(
            "{}/sites/{}/lists/{}/items/{}/fields",
            self.base_url(),
            self.config.site_id,
            self.config.list_id,
            list_item.id
        );
        let builder = self.request(Method::PATCH, &url).await?.json(fields);
        self.send(step, builder).await?;
        Ok(())
    }

    async fn list_permissions(&self, item_id: &str) -> Result<Vec<Permission>> {
        let url = format!("{}/items/{}/permissions", self.drive_url(), item_id);
        let builder = self.request(Method::GET, &url).await?;
        let page: Collection<Permission> = self.send_json(Step::ReadPermissions, builder).await?;
        Ok(page.value)
    }

    async fn invite(&self, item_id: &str, principals: &[String]) -> Result<Vec<Permission>> {
        let url = format!("{}/items/{}/invite", self.drive_url(), item_id);
        let recipients: Vec<_> = principals
            .iter()
            .map(|id| json!({ "objectId": id }))
            .collect();
        let body = json!({
            "requireSignIn": true,
            "sendInvitation": false,
            "roles": ["read"],
            "recipients": recipients,
        });

        let builder = self.request(Method::POST, &url).await?.json(&body);
        let page: Collection<Permission> = self.send_json(Step::InvitePrincipal, builder).await?;
        Ok(page.value)
    }

    async fn create_link(&self, item_id: &str) -> Result<Permission> {
        let url = format!("{}/items/{}/createLink", self.drive_url(), item_id);
        let body = json!({
            "type": "view",
            "scope": "organization",
        });

        let builder = self.request(Method::POST, &url).await?.json(&body);
        self.send_json(Step::PublishLink, builder).await
    }
}
