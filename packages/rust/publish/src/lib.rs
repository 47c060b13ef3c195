//! Telegram announcement delivery.
//!
//! One operation: send a formatted message (title, excerpt, retrieval link)
//! to the configured chat through the bot API. Delivery failure is a
//! recoverable per-candidate error; the caller decides what to do with the
//! record's `published` flag.

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use anthology_shared::{AnthologyError, Result, Secrets, TelegramConfig};

/// Request body for the Telegram `sendMessage` method.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Telegram announcer bound to one bot and one destination chat.
pub struct Announcer {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl Announcer {
    /// Build the announcer from config and resolved secrets, reusing the
    /// process-wide HTTP client.
    pub fn new(client: Client, config: &TelegramConfig, secrets: &Secrets) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: secrets.telegram_token.clone(),
            chat_id: secrets.telegram_chat_id.clone(),
        }
    }

    /// Announce a newly stored work: bold title, excerpt, retrieval link.
    ///
    /// Non-2xx or transport failure is a [`AnthologyError::Publish`]. The
    /// token appears only in the request URL, never in logs or errors.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn announce(&self, title: &str, excerpt: &str, link: &str) -> Result<()> {
        let text = format_message(title, excerpt, link);
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);

        let body = SendMessage {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnthologyError::Publish(format!("sendMessage: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnthologyError::Publish(format!(
                "sendMessage: HTTP {status}"
            )));
        }

        debug!("announcement delivered");
        Ok(())
    }
}

/// Compose the announcement text.
fn format_message(title: &str, excerpt: &str, link: &str) -> String {
    format!(
        "<b>{}</b>\n\n{}\n\nЧитать: {link}",
        escape_html(title),
        escape_html(excerpt)
    )
}

/// Escape the characters Telegram's HTML parse mode reserves.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthology_shared::AppConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn announcer_for(server_uri: &str) -> Announcer {
        let mut config = AppConfig::default();
        config.telegram.api_base = server_uri.to_string();
        let secrets = Secrets {
            telegram_token: "42:token".into(),
            telegram_chat_id: "-100500".into(),
            blob_sign_secret: "unused".into(),
        };
        Announcer::new(Client::new(), &config.telegram, &secrets)
    }

    #[test]
    fn message_format_escapes_html() {
        let msg = format_message("Сказка <1>", "Жили & были", "https://x/works/a.txt");
        assert!(msg.starts_with("<b>Сказка &lt;1&gt;</b>\n\n"));
        assert!(msg.contains("Жили &amp; были"));
        assert!(msg.ends_with("Читать: https://x/works/a.txt"));
    }

    #[tokio::test]
    async fn announce_posts_send_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot42:token/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "-100500",
                "parse_mode": "HTML",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"message_id": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let announcer = announcer_for(&server.uri());
        announcer
            .announce("Сказка", "Жили-были", "file:///blobs/works/a.txt")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn announce_non_2xx_is_publish_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot42:token/sendMessage"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let announcer = announcer_for(&server.uri());
        let err = announcer
            .announce("Сказка", "Жили-были", "file:///x")
            .await
            .unwrap_err();
        assert!(matches!(err, AnthologyError::Publish(_)));
        assert!(err.to_string().contains("429"));
    }
}
