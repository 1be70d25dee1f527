use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub async fn post_json<T: serde::Serialize>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client.post(url).json(body).send().await
    }

    /// POST a JSON body and decode a JSON reply, failing on non-2xx status.
    pub async fn post_json_for<T: serde::Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<R, reqwest::Error> {
        self.post_json(url, body)
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
