use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob store config: {0}")]
    Config(String),
    #[error("blob upload failed: {0}")]
    Upload(String),
    #[error("blob delete failed: {0}")]
    Delete(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    pub public_id: String,
    pub url: String,
}

/// Opaque file storage. Upload failures are fatal to the attach step that
/// needed them; delete failures are logged and never block removing the
/// owning database row.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, original_name: &str) -> Result<StoredBlob, BlobError>;
    async fn delete(&self, public_id: &str) -> Result<(), BlobError>;
    #[allow(dead_code)]
    fn as_any(&self) -> &dyn Any;
}

/// HTTP-backed store: multipart POST to an upload endpoint that answers
/// `{public_id, url}`, JSON POST to a delete endpoint.
pub struct HttpBlobStore {
    client: reqwest::Client,
    upload_url: String,
    delete_url: String,
}

impl HttpBlobStore {
    pub fn from_env(client: reqwest::Client) -> Result<Self, BlobError> {
        let upload_url = std::env::var("BLOB_UPLOAD_URL")
            .map_err(|_| BlobError::Config("BLOB_UPLOAD_URL must be set".into()))?;
        let delete_url = std::env::var("BLOB_DELETE_URL")
            .map_err(|_| BlobError::Config("BLOB_DELETE_URL must be set".into()))?;

        Ok(Self {
            client,
            upload_url,
            delete_url,
        })
    }

    pub fn new(client: reqwest::Client, upload_url: String, delete_url: String) -> Self {
        Self {
            client,
            upload_url,
            delete_url,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn store(&self, bytes: Vec<u8>, original_name: &str) -> Result<StoredBlob, BlobError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(original_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BlobError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BlobError::Upload(format!(
                "upload endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<StoredBlob>()
            .await
            .map_err(|e| BlobError::Upload(e.to_string()))
    }

    async fn delete(&self, public_id: &str) -> Result<(), BlobError> {
        let response = self
            .client
            .post(&self.delete_url)
            .json(&serde_json::json!({ "public_id": public_id }))
            .send()
            .await
            .map_err(|e| BlobError::Delete(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BlobError::Delete(format!(
                "delete endpoint returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Records stores/deletes for tests.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct MockBlobStore {
    pub stored: Mutex<Vec<(String, usize)>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_store: bool,
    pub fail_delete: bool,
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn store(&self, bytes: Vec<u8>, original_name: &str) -> Result<StoredBlob, BlobError> {
        if self.fail_store {
            return Err(BlobError::Upload("mock failure".into()));
        }
        self.stored
            .lock()
            .unwrap()
            .push((original_name.to_string(), bytes.len()));
        Ok(StoredBlob {
            public_id: format!("mock/{}", original_name),
            url: format!("https://blobs.example.com/mock/{}", original_name),
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), BlobError> {
        if self.fail_delete {
            return Err(BlobError::Delete("mock failure".into()));
        }
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn uploads_and_parses_stored_blob() {
        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "public_id": "ticket_files/abc123",
                    "url": "https://cdn.example.com/ticket_files/abc123"
                }));
        });

        let store = HttpBlobStore::new(
            reqwest::Client::new(),
            server.url("/upload"),
            server.url("/delete"),
        );

        let blob = store
            .store(b"file-bytes".to_vec(), "manual.pdf")
            .await
            .unwrap();

        upload.assert();
        assert_eq!(blob.public_id, "ticket_files/abc123");
        assert_eq!(blob.url, "https://cdn.example.com/ticket_files/abc123");
    }

    #[tokio::test]
    async fn upload_error_surfaces_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(500);
        });

        let store = HttpBlobStore::new(
            reqwest::Client::new(),
            server.url("/upload"),
            server.url("/delete"),
        );

        let err = store.store(vec![1, 2, 3], "broken.bin").await.unwrap_err();
        assert!(matches!(err, BlobError::Upload(_)));
    }

    #[tokio::test]
    async fn delete_posts_public_id() {
        let server = MockServer::start();
        let delete = server.mock(|when, then| {
            when.method(POST)
                .path("/delete")
                .json_body(serde_json::json!({ "public_id": "ticket_files/abc123" }));
            then.status(200);
        });

        let store = HttpBlobStore::new(
            reqwest::Client::new(),
            server.url("/upload"),
            server.url("/delete"),
        );

        store.delete("ticket_files/abc123").await.unwrap();
        delete.assert();
    }
}
