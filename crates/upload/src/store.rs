//! Object store seam and the S3 implementation
//!
//! The pipeline talks to the store through [`ObjectStore`] so tests can use
//! an in-memory implementation. [`S3Store`] wires up the AWS SDK with
//! optional static credentials, a custom endpoint (MinIO and friends), and
//! SSE-KMS passthrough.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::Client;
use sluice_config::{Config, EncryptionType};

use crate::error::UploadError;

/// Destination for encoded buffers
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` at `key`, replacing any existing object
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), UploadError>;
}

/// AWS S3 object store
pub struct S3Store {
    client: Client,
    bucket: String,
    encryption_type: EncryptionType,
    encryption_key: Option<String>,
}

impl S3Store {
    /// Build a client from the target configuration
    ///
    /// Credentials come from the config when both keys are present,
    /// otherwise from the usual environment/instance-role chain.
    pub async fn connect(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        if let (Some(access_key), Some(secret_key)) =
            (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            let creds = aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "sluice-config",
            );
            loader = loader.credentials_provider(creds);
        }

        let aws_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.s3_bucket.clone(),
            encryption_type: config.encryption_type,
            encryption_key: config.encryption_key.clone(),
        }
    }

    /// The destination bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// In-memory object store
///
/// Collects every put so assertions can inspect keys and bodies. Used by
/// tests here and in the router crate; never constructed in production.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: std::sync::Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All objects written so far, in order
    pub fn objects(&self) -> Vec<(String, Vec<u8>)> {
        self.objects.lock().unwrap().clone()
    }

    /// Keys written so far, in order
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), UploadError> {
        self.objects.lock().unwrap().push((key.to_string(), body));
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), UploadError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body));

        if self.encryption_type == EncryptionType::Kms {
            request = request.server_side_encryption(ServerSideEncryption::AwsKms);
            if let Some(key_id) = &self.encryption_key {
                request = request.ssekms_key_id(key_id);
            }
        }

        request
            .send()
            .await
            .map_err(|e| UploadError::store(key, DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
