use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;

use crate::config::R2Config;
use crate::error::{AppError, AppResult};

use super::PhotoStore;

/// Item photos on Cloudflare R2 through its S3-compatible endpoint.
pub struct R2Backend {
    bucket: Box<Bucket>,
    bucket_name: String,
    endpoint: String,
}

impl R2Backend {
    pub fn new(config: &R2Config) -> AppResult<Self> {
        let endpoint = format!("https://{}.r2.cloudflarestorage.com", config.account_id);
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.clone(),
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Storage(format!("R2 credentials error: {}", e)))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| AppError::Storage(format!("R2 bucket error: {}", e)))?;

        Ok(Self {
            bucket,
            bucket_name: config.bucket.clone(),
            endpoint,
        })
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket_name, key)
    }
}

#[async_trait::async_trait]
impl PhotoStore for R2Backend {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;
        if !(200..300).contains(&response.status_code()) {
            return Err(AppError::Storage(format!(
                "R2 upload rejected: key={}, status={}",
                key,
                response.status_code()
            )));
        }

        tracing::debug!("R2 upload: bucket={}, key={}", self.bucket_name, key);
        Ok(self.object_url(key))
    }

    fn bucket(&self) -> &str {
        &self.bucket_name
    }
}
