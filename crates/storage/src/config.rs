//! Storage configuration from the environment.

use std::fmt;
use std::path::PathBuf;

use crate::StorageError;

const DEFAULT_LOCAL_ROOT: &str = "storage";
const DEFAULT_PUBLIC_URL: &str = "/uploads";
const DEFAULT_S3_REGION: &str = "us-east-1";
/// R2 ignores the region but the SDK requires one.
const R2_REGION: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskKind {
    Local,
    S3,
    R2,
}

impl DiskKind {
    pub fn parse(value: &str) -> Result<Self, StorageError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            "r2" => Ok(Self::R2),
            other => Err(StorageError::Config(format!(
                "unknown STORAGE_DISK '{other}' (expected local, s3 or r2)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
            Self::R2 => "r2",
        }
    }
}

impl fmt::Display for DiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket settings shared by the S3 and R2 disks.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (R2, MinIO). `None` uses AWS.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub force_path_style: bool,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub disk: DiskKind,
    pub local_root: PathBuf,
    pub public_url: String,
    pub s3: Option<S3Config>,
}

impl StorageConfig {
    /// Load storage configuration from environment variables.
    ///
    /// | Variable               | Default     | Notes                   |
    /// |------------------------|-------------|-------------------------|
    /// | `STORAGE_DISK`         | `local`     | `local`, `s3` or `r2`   |
    /// | `STORAGE_LOCAL_ROOT`   | `storage`   | local disk root         |
    /// | `STORAGE_PUBLIC_URL`   | `/uploads`  | prefix for public URLs  |
    /// | `S3_BUCKET`            | -           | required for s3 / r2    |
    /// | `S3_REGION`            | `us-east-1` | `auto` for r2           |
    /// | `S3_ENDPOINT`          | -           | custom endpoint         |
    /// | `S3_ACCESS_KEY_ID`     | -           | static credentials      |
    /// | `S3_SECRET_ACCESS_KEY` | -           | static credentials      |
    /// | `R2_ACCOUNT_ID`        | -           | derives the r2 endpoint |
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        let var = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let disk = match var("STORAGE_DISK") {
            Some(value) => DiskKind::parse(&value)?,
            None => DiskKind::Local,
        };

        let s3 = match disk {
            DiskKind::Local => None,
            DiskKind::S3 | DiskKind::R2 => {
                let bucket = var("S3_BUCKET").ok_or_else(|| {
                    StorageError::Config(format!("S3_BUCKET is required for the {disk} disk"))
                })?;
                let access_key_id = var("S3_ACCESS_KEY_ID");
                let secret_access_key = var("S3_SECRET_ACCESS_KEY");
                if access_key_id.is_some() != secret_access_key.is_some() {
                    return Err(StorageError::Config(
                        "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together".into(),
                    ));
                }

                let (region, endpoint) = if disk == DiskKind::R2 {
                    let endpoint = match var("S3_ENDPOINT") {
                        Some(endpoint) => endpoint,
                        None => {
                            let account = var("R2_ACCOUNT_ID").ok_or_else(|| {
                                StorageError::Config(
                                    "R2_ACCOUNT_ID or S3_ENDPOINT is required for the r2 disk"
                                        .into(),
                                )
                            })?;
                            format!("https://{account}.r2.cloudflarestorage.com")
                        }
                    };
                    (R2_REGION.to_string(), Some(endpoint))
                } else {
                    (
                        var("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                        var("S3_ENDPOINT"),
                    )
                };

                Some(S3Config {
                    bucket,
                    force_path_style: endpoint.is_some(),
                    region,
                    endpoint,
                    access_key_id,
                    secret_access_key,
                })
            }
        };

        let public_url = match var("STORAGE_PUBLIC_URL") {
            Some(url) => url,
            None => default_public_url(disk, s3.as_ref()),
        };

        Ok(Self {
            disk,
            local_root: var("STORAGE_LOCAL_ROOT")
                .unwrap_or_else(|| DEFAULT_LOCAL_ROOT.to_string())
                .into(),
            public_url,
            s3,
        })
    }
}

fn default_public_url(disk: DiskKind, s3: Option<&S3Config>) -> String {
    match (disk, s3) {
        (DiskKind::Local, _) | (_, None) => DEFAULT_PUBLIC_URL.to_string(),
        (_, Some(s3)) => match &s3.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), s3.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", s3.bucket, s3.region),
        },
    }
}
