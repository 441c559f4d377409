//! Resend HTTP API transport.

use std::time::Duration;

use async_trait::async_trait;
use leadline_shared::{Attempt, LeadlineError, ResendConfig, Result, Secret};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::message::{OutboundEmail, SendReceipt};
use crate::transport::Mailer;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Sends through `POST {endpoint}` with a bearer token.
pub struct ResendMailer {
    client: Client,
    endpoint: String,
    api_key: Secret,
}

impl ResendMailer {
    pub fn new(config: &ResendConfig, api_key: Secret) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadlineError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip_all, fields(to = %email.to))]
    async fn send(&self, email: &OutboundEmail) -> Attempt<SendReceipt> {
        let request = SendRequest {
            from: email.from_header(),
            to: [email.to.as_str()],
            subject: &email.subject,
            text: &email.body,
            reply_to: email.reply_to.as_deref(),
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Attempt::Retryable(LeadlineError::timeout(format!("resend: {e}")));
            }
            Err(e) => return Attempt::Retryable(LeadlineError::network(format!("resend: {e}"))),
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), detail = %detail, "resend rejected message");
            return Attempt::failed(LeadlineError::http(status.as_u16(), &self.endpoint));
        }

        // Accepted even if the body is unexpected; the id is informational.
        let id = response
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|body| body.id);
        debug!(id = ?id, "resend accepted");
        Attempt::Ok(SendReceipt { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn email() -> OutboundEmail {
        OutboundEmail {
            from_name: "Counselor Directory".into(),
            from_email: "lauren@directory.example".into(),
            to: "jane@janesmith.com".into(),
            subject: "Hello".into(),
            body: "Hi Jane".into(),
            reply_to: Some("owner@directory.example".into()),
        }
    }

    fn mailer(server: &MockServer) -> ResendMailer {
        let config = ResendConfig {
            endpoint: format!("{}/emails", server.uri()),
            ..ResendConfig::default()
        };
        ResendMailer::new(&config, Secret::new("re_test")).unwrap()
    }

    #[tokio::test]
    async fn posts_message_and_reads_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_json(serde_json::json!({
                "from": "Counselor Directory <lauren@directory.example>",
                "to": ["jane@janesmith.com"],
                "subject": "Hello",
                "text": "Hi Jane",
                "reply_to": "owner@directory.example"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "msg_1"})))
            .expect(1)
            .mount(&server)
            .await;

        match mailer(&server).send(&email()).await {
            Attempt::Ok(receipt) => assert_eq!(receipt.id.as_deref(), Some("msg_1")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        assert!(mailer(&server).send(&email()).await.is_retryable());
    }

    #[tokio::test]
    async fn validation_error_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid to"))
            .mount(&server)
            .await;
        assert!(matches!(
            mailer(&server).send(&email()).await,
            Attempt::Permanent(LeadlineError::Http { status: 422, .. })
        ));
    }
}
