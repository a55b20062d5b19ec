use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StorageConfig;

/// Reference to an uploaded object on the media host.
///
/// `key` is kept alongside the public `url` so a failed store write can
/// compensate by deleting the remote object again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub key: String,
    pub content_type: String,
}

/// One file lifted out of a multipart body, ready for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub body: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    fn object_url(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    // Path-style addressing, matching force_path_style above.
    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

/// Upload one image under `prefix` and return its reference.
///
/// The object key is `<prefix>/<random id>.<ext>`, so retries of the same
/// logical upload never collide.
pub async fn store_image(
    storage: &dyn StorageClient,
    prefix: &str,
    image: ImageUpload,
) -> anyhow::Result<ImageRef> {
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("{}/{}.{}", prefix.trim_end_matches('/'), Uuid::new_v4(), ext);
    storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(ImageRef {
        url: storage.object_url(&key),
        key,
        content_type: image.content_type,
    })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[test]
    fn image_ref_round_trips_through_json() {
        let img = ImageRef {
            url: "https://media.local/bucket/offers/x/y.jpg".into(),
            key: "offers/x/y.jpg".into(),
            content_type: "image/jpeg".into(),
        };
        let value = serde_json::to_value(&img).unwrap();
        assert_eq!(value["url"], "https://media.local/bucket/offers/x/y.jpg");
        let back: ImageRef = serde_json::from_value(value).unwrap();
        assert_eq!(back, img);
    }

    #[tokio::test]
    async fn store_image_keys_under_prefix() {
        let state = crate::state::AppState::fake();
        let image = ImageUpload {
            body: Bytes::from_static(b"fake bytes"),
            content_type: "image/png".into(),
        };
        let img = store_image(state.storage.as_ref(), "offers/abc", image)
            .await
            .unwrap();
        assert!(img.key.starts_with("offers/abc/"));
        assert!(img.key.ends_with(".png"));
        assert!(img.url.ends_with(&img.key));
        assert_eq!(img.content_type, "image/png");
    }

    #[tokio::test]
    async fn store_image_falls_back_to_bin_extension() {
        let state = crate::state::AppState::fake();
        let image = ImageUpload {
            body: Bytes::from_static(b"?"),
            content_type: "application/octet-stream".into(),
        };
        let img = store_image(state.storage.as_ref(), "users/u1", image)
            .await
            .unwrap();
        assert!(img.key.ends_with(".bin"));
    }
}
