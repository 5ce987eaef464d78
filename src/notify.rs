use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Status(StatusCode),
}

/// Posts plain-text alerts to an incoming webhook as `{"text": ...}`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// One POST per call; no retry.
    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let payload = serde_json::json!({ "text": text });
        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "webhook rejected alert");
            return Err(NotifyError::Status(status));
        }
        tracing::info!(%status, "alert delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one request, answers with `status_line`, and hands back the request body.
    async fn one_shot_server(
        status_line: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}/hook", listener.local_addr().expect("addr"));

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let body = loop {
                let read = socket.read(&mut chunk).await.expect("read");
                if read == 0 {
                    break String::new();
                }
                buf.extend_from_slice(&chunk[..read]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some((head, body)) = text.split_once("\r\n\r\n") {
                    let length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if body.len() >= length {
                        break body.to_string();
                    }
                }
            };
            let response = format!(
                "{status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok"
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            body
        });

        (url, handle)
    }

    #[tokio::test]
    async fn posts_text_payload() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let notifier = WebhookNotifier::new(url);
        notifier.send("Revenue anomaly").await.expect("send");

        let body = server.await.expect("server");
        let payload: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(payload["text"], "Revenue anomaly");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, server) = one_shot_server("HTTP/1.1 500 Internal Server Error").await;
        let err = WebhookNotifier::new(url).send("x").await.unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Status(status) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let err = WebhookNotifier::new(format!("http://{addr}/hook"))
            .send("x")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Request(_)));
    }
}
