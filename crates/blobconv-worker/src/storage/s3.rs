use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::Region,
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use blobconv_common::ObjectName;
use tracing::{debug, info, instrument};

use super::config::{S3Config, S3Credentials, DEFAULT_S3_REGION};
use super::{content_type_for, ObjectStore, StoreError, StoreResult};

/// Build an S3 client from `config`
///
/// Static keys are wired in directly; otherwise the AWS default provider chain
/// (environment, profile, instance role) resolves credentials lazily on the
/// first request.
pub async fn connect(config: &S3Config) -> Client {
    debug!("Initializing S3 client with config: {:?}", config);

    let region = Region::new(config.region.clone());
    let mut builder = match &config.credentials {
        S3Credentials::Static {
            access_key,
            secret_key,
        } => aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "blobconv-static",
            ))
            .region(region),
        S3Credentials::DefaultChain => {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            aws_sdk_s3::config::Builder::from(&shared)
        }
    };

    builder = builder.force_path_style(config.path_style);
    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint_url(endpoint);
    }

    info!(
        region = %config.region,
        endpoint = config.endpoint.as_deref().unwrap_or("aws"),
        "S3 client initialized"
    );

    Client::from_conf(builder.build())
}

/// One S3 bucket
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: &str, region: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            region: region.to_string(),
        }
    }
}

fn sdk_error<E: std::error::Error>(action: &str, err: E) -> StoreError {
    StoreError::backend(format!("{}: {}", action, DisplayErrorContext(err)))
}

#[async_trait]
impl ObjectStore for S3Store {
    fn container(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn container_exists(&self) -> StoreResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false) =>
            {
                Ok(false)
            }
            Err(err) => Err(sdk_error("Failed to check bucket", err)),
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn create_if_missing(&self) -> StoreResult<()> {
        if self.container_exists().await? {
            debug!("Bucket s3://{} already exists", self.bucket);
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket);
        // us-east-1 rejects an explicit location constraint
        if self.region != DEFAULT_S3_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!("Created bucket s3://{}", self.bucket);
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_bucket_already_owned_by_you())
                    .unwrap_or(false) =>
            {
                debug!("Bucket s3://{} created concurrently", self.bucket);
                Ok(())
            }
            Err(err) => Err(sdk_error("Failed to create bucket", err)),
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false) =>
            {
                Ok(false)
            }
            Err(err) => Err(sdk_error("Failed to check object existence", err)),
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self) -> StoreResult<Vec<ObjectName>> {
        let mut names = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|err| {
                    if err
                        .as_service_error()
                        .map(|e| e.is_no_such_bucket())
                        .unwrap_or(false)
                    {
                        StoreError::ContainerNotFound(self.bucket.clone())
                    } else {
                        sdk_error("Failed to list objects", err)
                    }
                })?;

            pages += 1;
            names.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(|k| k.to_string())),
            );

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(
            "Listed {} objects in s3://{} ({} page(s))",
            names.len(),
            self.bucket,
            pages
        );

        Ok(names)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    StoreError::ObjectNotFound(name.to_string())
                } else {
                    sdk_error("Failed to download object", err)
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|err| sdk_error("Failed to read object body", err))?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), self.bucket, name);

        Ok(data)
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, size = data.len()))]
    async fn write(&self, name: &str, data: Vec<u8>) -> StoreResult<()> {
        let size = data.len();
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(data));

        if let Some(content_type) = content_type_for(name) {
            request = request.content_type(content_type);
        }

        request
            .send()
            .await
            .map_err(|err| sdk_error("Failed to upload object", err))?;

        debug!("Uploaded {} bytes to s3://{}/{}", size, self.bucket, name);

        Ok(())
    }
}
