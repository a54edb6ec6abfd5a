use blobconv_common::{BlobconvError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default region when `S3_REGION` is unset.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Which backend to talk to, and how to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    S3(S3Config),
    Local(LocalConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub path_style: bool,
    pub credentials: S3Credentials,
}

/// How the S3 client authenticates
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum S3Credentials {
    /// Access key pair given explicitly
    Static {
        access_key: String,
        #[serde(skip_serializing)]
        secret_key: String,
    },
    /// Environment, profile, or instance role, resolved by the AWS provider chain
    DefaultChain,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            S3Credentials::Static { access_key, .. } => f
                .debug_struct("Static")
                .field("access_key", access_key)
                .field("secret_key", &"<redacted>")
                .finish(),
            S3Credentials::DefaultChain => f.write_str("DefaultChain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory holding one sub-directory per container
    pub root: PathBuf,
}

impl StoreConfig {
    /// Load from process environment
    ///
    /// - `BLOBCONV_STORE_BACKEND`: `s3` (default) or `local`
    /// - `S3_ENDPOINT`, `S3_REGION`, `S3_PATH_STYLE`
    /// - `S3_ACCESS_KEY` / `S3_SECRET_KEY` (or `AWS_ACCESS_KEY_ID` /
    ///   `AWS_SECRET_ACCESS_KEY`), or `S3_USE_DEFAULT_CREDENTIALS=true`
    /// - `BLOBCONV_LOCAL_ROOT` for the local backend
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = get("BLOBCONV_STORE_BACKEND").unwrap_or_else(|| "s3".to_string());
        match backend.trim().to_lowercase().as_str() {
            "s3" | "minio" => Self::s3_from_lookup(&get),
            "local" | "fs" => {
                let root = get("BLOBCONV_LOCAL_ROOT").ok_or_else(|| {
                    BlobconvError::config("BLOBCONV_LOCAL_ROOT must be set for the local backend")
                })?;
                Ok(StoreConfig::Local(LocalConfig {
                    root: PathBuf::from(root),
                }))
            }
            other => Err(BlobconvError::config(format!(
                "unknown BLOBCONV_STORE_BACKEND '{}'; expected 's3' or 'local'",
                other
            ))),
        }
    }

    fn s3_from_lookup<F>(get: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key = get("S3_ACCESS_KEY").or_else(|| get("AWS_ACCESS_KEY_ID"));
        let secret_key = get("S3_SECRET_KEY").or_else(|| get("AWS_SECRET_ACCESS_KEY"));
        let use_default_chain = parse_flag(get("S3_USE_DEFAULT_CREDENTIALS").as_deref())?;

        let credentials = match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => S3Credentials::Static {
                access_key,
                secret_key,
            },
            (Some(_), None) | (None, Some(_)) => {
                return Err(BlobconvError::config(
                    "S3 access key and secret key must be set together",
                ));
            }
            (None, None) if use_default_chain => S3Credentials::DefaultChain,
            (None, None) => {
                return Err(BlobconvError::config(
                    "either S3_ACCESS_KEY and S3_SECRET_KEY or S3_USE_DEFAULT_CREDENTIALS=true must be set",
                ));
            }
        };

        Ok(StoreConfig::S3(S3Config {
            endpoint: get("S3_ENDPOINT"),
            region: get("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            path_style: parse_flag(get("S3_PATH_STYLE").as_deref())?,
            credentials,
        }))
    }

    /// Static-key config for a MinIO endpoint
    pub fn for_minio(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        StoreConfig::S3(S3Config {
            endpoint: Some(endpoint.into()),
            region: DEFAULT_S3_REGION.to_string(),
            path_style: true,
            credentials: S3Credentials::Static {
                access_key: access_key.into(),
                secret_key: secret_key.into(),
            },
        })
    }

    pub fn for_local(root: impl Into<PathBuf>) -> Self {
        StoreConfig::Local(LocalConfig { root: root.into() })
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::S3(_) => "s3",
            StoreConfig::Local(_) => "local",
        }
    }
}

fn parse_flag(value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(BlobconvError::config(format!(
                "expected a boolean, got '{}'",
                v
            ))),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_s3_with_static_keys() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("S3_ACCESS_KEY", "minioadmin"),
            ("S3_SECRET_KEY", "minioadmin"),
            ("S3_PATH_STYLE", "true"),
        ]))
        .unwrap();

        let StoreConfig::S3(s3) = config else {
            panic!("expected s3 config");
        };
        assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(s3.region, DEFAULT_S3_REGION);
        assert!(s3.path_style);
        assert!(matches!(s3.credentials, S3Credentials::Static { .. }));
    }

    #[test]
    fn test_s3_falls_back_to_aws_key_names() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "shh"),
            ("S3_REGION", "eu-west-1"),
        ]))
        .unwrap();

        let StoreConfig::S3(s3) = config else {
            panic!("expected s3 config");
        };
        assert_eq!(s3.region, "eu-west-1");
        assert!(!s3.path_style);
    }

    #[test]
    fn test_s3_default_chain() {
        let config =
            StoreConfig::from_lookup(lookup(&[("S3_USE_DEFAULT_CREDENTIALS", "yes")])).unwrap();
        let StoreConfig::S3(s3) = config else {
            panic!("expected s3 config");
        };
        assert_eq!(s3.credentials, S3Credentials::DefaultChain);
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let err = StoreConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, BlobconvError::Config(_)));

        let err = StoreConfig::from_lookup(lookup(&[("S3_ACCESS_KEY", "only-half")])).unwrap_err();
        assert!(err.to_string().contains("together"));
    }

    #[test]
    fn test_local_backend_requires_root() {
        let err =
            StoreConfig::from_lookup(lookup(&[("BLOBCONV_STORE_BACKEND", "local")])).unwrap_err();
        assert!(matches!(err, BlobconvError::Config(_)));

        let config = StoreConfig::from_lookup(lookup(&[
            ("BLOBCONV_STORE_BACKEND", "LOCAL"),
            ("BLOBCONV_LOCAL_ROOT", "/srv/blobs"),
        ]))
        .unwrap();
        assert_eq!(config, StoreConfig::for_local("/srv/blobs"));
    }

    #[test]
    fn test_unknown_backend_and_bad_flag() {
        assert!(StoreConfig::from_lookup(lookup(&[("BLOBCONV_STORE_BACKEND", "ftp")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[
            ("S3_USE_DEFAULT_CREDENTIALS", "true"),
            ("S3_PATH_STYLE", "sideways"),
        ]))
        .is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var("BLOBCONV_STORE_BACKEND", "local");
        std::env::set_var("BLOBCONV_LOCAL_ROOT", "/srv/from-env");
        let config = StoreConfig::from_env();
        std::env::remove_var("BLOBCONV_STORE_BACKEND");
        std::env::remove_var("BLOBCONV_LOCAL_ROOT");

        assert_eq!(config.unwrap(), StoreConfig::for_local("/srv/from-env"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = StoreConfig::for_minio("http://localhost:9000", "minioadmin", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("minioadmin"));
        assert!(!rendered.contains("hunter2"));
    }
}
