use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::http_client::HttpClient;
use crate::models::Notification;

use super::Notifier;

/// Sends email through an HTTP mail relay.
///
/// The relay accepts `{recipient_email, subject, body, user_id}` and answers
/// with `{successful, error}`.
pub struct MailRelayNotifier {
    http_client: Arc<HttpClient>,
    relay_url: Option<String>,
    sender: String,
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    recipient_email: &'a str,
    subject: &'a str,
    body: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    successful: bool,
    #[serde(default)]
    error: Option<String>,
}

impl MailRelayNotifier {
    pub fn new(
        http_client: Arc<HttpClient>,
        relay_url: Option<String>,
        sender: String,
        enabled: bool,
    ) -> Self {
        Self {
            http_client,
            relay_url,
            sender,
            enabled,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for MailRelayNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        notification.validate()?;

        let relay_url = match &self.relay_url {
            Some(url) => url,
            None => {
                tracing::debug!("Mail relay URL not configured, cannot deliver notification");
                return Err(AppError::Notification(
                    "mail relay not configured".to_string(),
                ));
            }
        };

        if !self.enabled {
            tracing::debug!("Notifications disabled, holding notification");
            return Err(AppError::Notification("notifications disabled".to_string()));
        }

        let payload = RelayRequest {
            recipient_email: &notification.recipient_email,
            subject: &notification.subject,
            body: &notification.body,
            user_id: &self.sender,
        };

        let api_url = format!("{}/send", relay_url.trim_end_matches('/'));

        let response: RelayResponse = self
            .http_client
            .post_json_for(&api_url, &payload)
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach mail relay: {}", e);
                AppError::Http(e)
            })?;

        if !response.successful {
            let reason = response
                .error
                .unwrap_or_else(|| "mail relay reported failure".to_string());
            tracing::error!("Mail relay rejected notification: {}", reason);
            return Err(AppError::Notification(reason));
        }

        tracing::info!(
            "Notification sent: to={}, subject={}",
            notification.recipient_email,
            notification.subject
        );
        Ok(())
    }

    fn backend_tag(&self) -> &'static str {
        "mail-relay"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn notification() -> Notification {
        Notification {
            recipient_email: "ada@school.test".to_string(),
            subject: "Lost & Found: Pickup Request Approved".to_string(),
            body: "Your request has been approved.".to_string(),
        }
    }

    fn notifier(url: Option<String>, enabled: bool) -> MailRelayNotifier {
        MailRelayNotifier::new(
            Arc::new(HttpClient::new(Duration::from_secs(5)).unwrap()),
            url,
            "frontdesk@school.test".to_string(),
            enabled,
        )
    }

    /// Answer a single HTTP request with `reply`, returning the raw request.
    async fn serve_once(
        status: &'static str,
        reply: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let content_length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                reply.len(),
                reply
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (url, handle)
    }

    #[tokio::test]
    async fn test_send_posts_payload() {
        let (url, handle) = serve_once("200 OK", r#"{"successful":true,"data":{"id":"m1"}}"#).await;
        notifier(Some(url), true).send(&notification()).await.unwrap();

        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /send"));
        assert!(request.contains("\"recipient_email\":\"ada@school.test\""));
        assert!(request.contains("\"user_id\":\"frontdesk@school.test\""));
    }

    #[tokio::test]
    async fn test_relay_failure_is_error() {
        let (url, _handle) =
            serve_once("200 OK", r#"{"successful":false,"error":"quota exceeded"}"#).await;
        let err = notifier(Some(url), true)
            .send(&notification())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Notification(ref m) if m == "quota exceeded"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_error() {
        let (url, _handle) = serve_once("502 Bad Gateway", r#"{"successful":false}"#).await;
        let err = notifier(Some(url), true)
            .send(&notification())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Http(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_or_disabled_fails() {
        assert!(notifier(None, true).send(&notification()).await.is_err());
        assert!(notifier(Some("http://127.0.0.1:9".to_string()), false)
            .send(&notification())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_invalid_notification_rejected_before_delivery() {
        let mut n = notification();
        n.recipient_email.clear();
        let err = notifier(None, true).send(&n).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
