use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::StorageConfig;

/// How long presigned download links stay valid.
pub const PRESIGN_TTL_SECS: u64 = 30 * 60;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
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

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        let req = self.client.get_object().bucket(&self.bucket).key(key);
        let presigned = req
            .presigned(PresigningConfig::expires_in(
                std::time::Duration::from_secs(seconds),
            )?)
            .await
            .context("s3 presign_get")?;
        Ok(presigned.uri().to_string())
    }
}

/// Guesses a document's MIME type from its leading bytes.
pub fn sniff_content_type(body: &[u8]) -> &'static str {
    if body.starts_with(b"%PDF") {
        "application/pdf"
    } else if body.starts_with(b"PK\x03\x04") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else if body.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        "application/msword"
    } else if std::str::from_utf8(body).is_ok() {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "text/plain" => Some("txt"),
        _ => None,
    }
}

pub fn resume_key(applicant_id: Uuid, job_id: Uuid, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!(
        "resumes/{}/{}-{}.{}",
        applicant_id,
        job_id,
        Uuid::new_v4(),
        ext
    )
}

pub fn cv_key(user_id: Uuid, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("cvs/{}/{}.{}", user_id, Uuid::new_v4(), ext)
}

#[cfg(test)]
pub use fake::FakeStorage;

#[cfg(test)]
mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Keeps objects in memory and hands out `https://fake.local/` links.
    #[derive(Default)]
    pub struct FakeStorage {
        objects: Mutex<HashMap<String, (Bytes, String)>>,
        fail_puts: Mutex<bool>,
    }

    impl FakeStorage {
        pub fn object(&self, key: &str) -> Option<(Bytes, String)> {
            self.objects.lock().unwrap().get(key).cloned()
        }

        pub fn len(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        pub fn fail_puts(&self) {
            *self.fail_puts.lock().unwrap() = true;
        }
    }

    #[async_trait]
    impl StorageClient for FakeStorage {
        async fn put_object(&self, key: &str, body: Bytes, ct: &str) -> anyhow::Result<()> {
            if *self.fail_puts.lock().unwrap() {
                anyhow::bail!("bucket unavailable");
            }
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), (body, ct.to_string()));
            Ok(())
        }

        async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        async fn presign_get(&self, key: &str, _seconds: u64) -> anyhow::Result<String> {
            Ok(format!("https://fake.local/{}", key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_content_type() {
        assert_eq!(sniff_content_type(b"%PDF-1.7\n..."), "application/pdf");
        assert_eq!(sniff_content_type(b"PK\x03\x04rest"), ext_mime("docx"));
        assert_eq!(sniff_content_type(b"Experienced engineer"), "text/plain");
        assert_eq!(
            sniff_content_type(&[0xff, 0xfe, 0x00, 0x80]),
            "application/octet-stream"
        );
    }

    fn ext_mime(ext: &str) -> &'static str {
        match ext {
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_keys_carry_owner_and_extension() {
        let user = Uuid::new_v4();
        let job = Uuid::new_v4();
        let key = resume_key(user, job, "application/pdf");
        assert!(key.starts_with(&format!("resumes/{}/{}-", user, job)));
        assert!(key.ends_with(".pdf"));
        assert!(cv_key(user, "application/zip").ends_with(".bin"));
    }
}
