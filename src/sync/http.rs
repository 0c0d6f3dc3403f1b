use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::core::attachment::{Attachment, AttachmentUpload};
use crate::core::item::Item;
use crate::core::list::List;
use crate::core::note::Note;
use crate::core::patch::{ItemPatch, ListPatch};
use crate::sync::gateway::{
    ChangeBatch, Gateway, GatewayError, ItemDraft, ListDraft, UserCheck,
};
use crate::sync::realtime::{ChangeEvent, RawChange};

/// Session established by a password sign-in.
#[derive(Debug, Clone, Deserialize)]
struct Session {
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChangesResponse {
    changes: Vec<RawChange>,
    #[serde(default)]
    cursor: Option<String>,
}

/// REST client for the hosted backend. Every call is scoped server-side to
/// the signed-in user; the client never self-authorizes.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    http: Client,
}

impl HttpGateway {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            http,
        })
    }

    /// Exchange email/password for an access token.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), GatewayError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("Sign-in request failed: {}", e)))?;

        if resp.status() == StatusCode::BAD_REQUEST || resp.status() == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized);
        }
        if !resp.status().is_success() {
            return Err(map_status(resp.status(), read_body(resp).await));
        }
        let session: Session = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("Bad sign-in response: {}", e)))?;
        self.access_token = Some(session.access_token);
        log::info!("Signed in to {}", self.base_url);
        Ok(())
    }

    pub fn sign_out(&mut self) {
        self.access_token = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.access_token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, &url).header("apikey", &self.api_key);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Issue a request and decode a JSON body, mapping HTTP failures onto
    /// the gateway error taxonomy.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, GatewayError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("{} request failed: {}", what, e)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(map_status(status, read_body(resp).await));
        }
        resp.json()
            .await
            .map_err(|e| GatewayError::Decode(format!("Bad {} response: {}", what, e)))
    }

    /// Like `fetch_json`, for row endpoints that answer with an array and a
    /// single row is expected back.
    async fn fetch_row<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, GatewayError> {
        let mut rows: Vec<T> = self.fetch_json(builder, what).await?;
        if rows.is_empty() {
            return Err(GatewayError::NotFound);
        }
        Ok(rows.remove(0))
    }

    async fn expect_ok(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<(), GatewayError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("{} request failed: {}", what, e)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(map_status(status, read_body(resp).await));
        }
        Ok(())
    }
}

async fn read_body(resp: reqwest::Response) -> String {
    resp.text().await.unwrap_or_default()
}

fn map_status(status: StatusCode, body: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
        StatusCode::FORBIDDEN => GatewayError::Forbidden(body),
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        StatusCode::CONFLICT => GatewayError::Conflict(body),
        _ => GatewayError::Server { status: status.as_u16(), body },
    }
}

impl Gateway for HttpGateway {
    async fn list_lists(&self) -> Result<Vec<List>, GatewayError> {
        self.fetch_json(
            self.request(Method::GET, "/rest/v1/lists?select=*&order=created_at.asc"),
            "list lists",
        )
        .await
    }

    async fn create_list(&self, draft: &ListDraft) -> Result<List, GatewayError> {
        self.fetch_row(
            self.request(Method::POST, "/rest/v1/lists")
                .header("Prefer", "return=representation")
                .json(draft),
            "create list",
        )
        .await
    }

    async fn update_list(&self, id: Uuid, patch: &ListPatch) -> Result<List, GatewayError> {
        self.fetch_row(
            self.request(Method::PATCH, &format!("/rest/v1/lists?id=eq.{}", id))
                .header("Prefer", "return=representation")
                .json(&patch.to_wire()),
            "update list",
        )
        .await
    }

    async fn delete_list(&self, id: Uuid) -> Result<(), GatewayError> {
        self.expect_ok(
            self.request(Method::DELETE, &format!("/rest/v1/lists?id=eq.{}", id)),
            "delete list",
        )
        .await
    }

    async fn list_items(&self) -> Result<Vec<Item>, GatewayError> {
        self.fetch_json(
            self.request(Method::GET, "/rest/v1/items?select=*&order=created_at.asc"),
            "list items",
        )
        .await
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, GatewayError> {
        self.fetch_row(
            self.request(Method::POST, "/rest/v1/items")
                .header("Prefer", "return=representation")
                .json(draft),
            "create item",
        )
        .await
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> Result<Item, GatewayError> {
        self.fetch_row(
            self.request(Method::PATCH, &format!("/rest/v1/items?id=eq.{}", id))
                .header("Prefer", "return=representation")
                .json(&patch.to_wire()),
            "update item",
        )
        .await
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), GatewayError> {
        self.expect_ok(
            self.request(Method::DELETE, &format!("/rest/v1/items?id=eq.{}", id)),
            "delete item",
        )
        .await
    }

    async fn add_note(&self, item_id: Uuid, content: &str) -> Result<Note, GatewayError> {
        let body = serde_json::json!({ "item_id": item_id, "content": content });
        self.fetch_row(
            self.request(Method::POST, "/rest/v1/notes")
                .header("Prefer", "return=representation")
                .json(&body),
            "add note",
        )
        .await
    }

    async fn update_note(
        &self,
        item_id: Uuid,
        note_id: Uuid,
        content: &str,
    ) -> Result<Note, GatewayError> {
        let body = serde_json::json!({ "content": content });
        self.fetch_row(
            self.request(
                Method::PATCH,
                &format!("/rest/v1/notes?id=eq.{}&item_id=eq.{}", note_id, item_id),
            )
            .header("Prefer", "return=representation")
            .json(&body),
            "update note",
        )
        .await
    }

    async fn delete_note(&self, item_id: Uuid, note_id: Uuid) -> Result<(), GatewayError> {
        self.expect_ok(
            self.request(
                Method::DELETE,
                &format!("/rest/v1/notes?id=eq.{}&item_id=eq.{}", note_id, item_id),
            ),
            "delete note",
        )
        .await
    }

    /// Two-step upload: bytes into object storage, then the metadata row.
    async fn add_attachment(
        &self,
        item_id: Uuid,
        upload: &AttachmentUpload,
    ) -> Result<Attachment, GatewayError> {
        let storage_path = format!("attachments/{}/{}-{}", item_id, Uuid::new_v4(), upload.file_name);
        self.expect_ok(
            self.request(Method::POST, &format!("/storage/v1/object/{}", storage_path))
                .header("Content-Type", upload.file_type.clone())
                .body(upload.data.clone()),
            "upload attachment",
        )
        .await?;

        let body = serde_json::json!({
            "item_id": item_id,
            "file_name": upload.file_name,
            "storage_path": storage_path,
            "file_type": upload.file_type,
            "size": upload.size(),
        });
        self.fetch_row(
            self.request(Method::POST, "/rest/v1/attachments")
                .header("Prefer", "return=representation")
                .json(&body),
            "add attachment",
        )
        .await
    }

    /// Removes the metadata row and the stored object behind it.
    async fn delete_attachment(
        &self,
        item_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<(), GatewayError> {
        let attachment: Attachment = self
            .fetch_row(
                self.request(
                    Method::GET,
                    &format!(
                        "/rest/v1/attachments?id=eq.{}&item_id=eq.{}&select=*",
                        attachment_id, item_id
                    ),
                ),
                "fetch attachment",
            )
            .await?;
        self.expect_ok(
            self.request(
                Method::DELETE,
                &format!("/rest/v1/attachments?id=eq.{}", attachment_id),
            ),
            "delete attachment",
        )
        .await?;
        // Best-effort object removal; an orphaned blob is not a client error.
        if let Err(e) = self
            .expect_ok(
                self.request(
                    Method::DELETE,
                    &format!("/storage/v1/object/{}", attachment.storage_path),
                ),
                "delete stored object",
            )
            .await
        {
            log::warn!("Failed to remove stored object {}: {}", attachment.storage_path, e);
        }
        Ok(())
    }

    async fn check_users_exist(&self, emails: &[String]) -> Result<Vec<UserCheck>, GatewayError> {
        let body = serde_json::json!({ "emails": emails });
        self.fetch_json(
            self.request(Method::POST, "/rest/v1/rpc/check_users_exist").json(&body),
            "check users",
        )
        .await
    }

    async fn changes(
        &self,
        cursor: Option<&str>,
        lists: &[Uuid],
    ) -> Result<ChangeBatch, GatewayError> {
        let body = serde_json::json!({
            "cursor": cursor,
            "list_ids": lists,
        });
        let resp: ChangesResponse = self
            .fetch_json(
                self.request(Method::POST, "/rest/v1/rpc/changes").json(&body),
                "poll changes",
            )
            .await?;
        let events = resp.changes.into_iter().filter_map(ChangeEvent::decode).collect();
        Ok(ChangeBatch { events, cursor: resp.cursor })
    }
}
