//! S3-compatible object store (AWS, MinIO). Credentials come from the
//! standard AWS environment variables and profile files.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};

use crate::error::{SnapshotError, SnapshotResult};
use crate::store::ObjectStore;

pub struct S3Store {
    bucket: Box<Bucket>,
}

impl S3Store {
    /// Connect to `bucket`. With an `endpoint` (MinIO and friends) the
    /// bucket is addressed path-style.
    pub fn new(bucket: &str, region: &str, endpoint: Option<&str>) -> SnapshotResult<Self> {
        let credentials =
            Credentials::default().map_err(|e| SnapshotError::store("open", bucket, e))?;
        let handle = match endpoint {
            Some(endpoint) => {
                let region = Region::Custom {
                    region: region.to_owned(),
                    endpoint: endpoint.to_owned(),
                };
                Bucket::new(bucket, region, credentials)
                    .map_err(|e| SnapshotError::store("open", bucket, e))?
                    .with_path_style()
            }
            None => {
                let region: Region = region
                    .parse()
                    .map_err(|e| SnapshotError::store("open", bucket, e))?;
                Bucket::new(bucket, region, credentials)
                    .map_err(|e| SnapshotError::store("open", bucket, e))?
            }
        };
        Ok(Self { bucket: handle })
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn get(&self, key: &str) -> SnapshotResult<Option<Vec<u8>>> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| SnapshotError::store("get", key, e))?;
        match response.status_code() {
            404 => Ok(None),
            status if is_success(status) => Ok(Some(response.bytes().to_vec())),
            status => Err(SnapshotError::store("get", key, format!("HTTP {status}"))),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> SnapshotResult<()> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &body, "application/json")
            .await
            .map_err(|e| SnapshotError::store("put", key, e))?;
        if is_success(response.status_code()) {
            Ok(())
        } else {
            Err(SnapshotError::store(
                "put",
                key,
                format!("HTTP {}", response.status_code()),
            ))
        }
    }

    async fn delete(&self, key: &str) -> SnapshotResult<()> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| SnapshotError::store("delete", key, e))?;
        match response.status_code() {
            404 => Ok(()),
            status if is_success(status) => Ok(()),
            status => Err(SnapshotError::store("delete", key, format!("HTTP {status}"))),
        }
    }

    async fn list(&self, prefix: &str) -> SnapshotResult<Vec<String>> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(|e| SnapshotError::store("list", prefix, e))?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect())
    }
}
