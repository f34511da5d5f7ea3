//! Bot API stand-in built on wiremock
//!
//! Every method answers with a minimal valid `Message` so teloxide parses the
//! reply (`createInvoiceLink` answers with a link); tests then inspect what
//! was sent.

#![allow(dead_code)]

use serde_json::{json, Value};
use teloxide::Bot;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_BOT_TOKEN: &str = "123456:TEST-TOKEN";
pub const TEST_INVOICE_LINK: &str = "https://t.me/$test-invoice";

/// A `sendMessage` call as received by the mock
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub reply_markup: Option<Value>,
}

impl SentMessage {
    /// Callback payloads of the inline keyboard, row by row
    pub fn callback_data(&self) -> Vec<String> {
        buttons(self.reply_markup.as_ref(), "callback_data")
    }
}

/// An `editMessageReplyMarkup` call as received by the mock
#[derive(Debug, Clone)]
pub struct KeyboardEdit {
    pub chat_id: i64,
    pub message_id: i64,
    pub reply_markup: Option<Value>,
}

impl KeyboardEdit {
    pub fn callback_data(&self) -> Vec<String> {
        buttons(self.reply_markup.as_ref(), "callback_data")
    }
}

fn buttons(markup: Option<&Value>, key: &str) -> Vec<String> {
    markup
        .and_then(|m| m["inline_keyboard"].as_array())
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|button| button[key].as_str().map(str::to_string))
        .collect()
}

pub struct TelegramMock {
    pub server: MockServer,
}

impl TelegramMock {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/(sendmessage|editmessagereplymarkup|setmycommands|setwebhook)$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {
                    "message_id": 1,
                    "date": 1714564800,
                    "chat": {"id": 1, "type": "private", "first_name": "Test"},
                    "text": "ok"
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/createinvoicelink$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": TEST_INVOICE_LINK
            })))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn bot(&self) -> Bot {
        let url = match self.server.uri().parse() {
            Ok(url) => url,
            Err(e) => panic!("mock server uri is not a URL: {e}"),
        };
        Bot::new(TEST_BOT_TOKEN).set_api_url(url)
    }

    async fn calls(&self, name: &str) -> Vec<Value> {
        let requests = self.server.received_requests().await.unwrap_or_default();
        requests
            .iter()
            .filter(|r| r.url.path().to_ascii_lowercase().ends_with(&format!("/{}", name)))
            .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
            .collect()
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.calls("sendmessage")
            .await
            .into_iter()
            .map(|body| SentMessage {
                chat_id: body["chat_id"].as_i64().unwrap_or_default(),
                text: body["text"].as_str().unwrap_or_default().to_string(),
                reply_markup: body.get("reply_markup").cloned(),
            })
            .collect()
    }

    pub async fn messages_to(&self, chat_id: i64) -> Vec<SentMessage> {
        self.sent_messages()
            .await
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect()
    }

    pub async fn keyboard_edits(&self) -> Vec<KeyboardEdit> {
        self.calls("editmessagereplymarkup")
            .await
            .into_iter()
            .map(|body| KeyboardEdit {
                chat_id: body["chat_id"].as_i64().unwrap_or_default(),
                message_id: body["message_id"].as_i64().unwrap_or_default(),
                reply_markup: body.get("reply_markup").cloned(),
            })
            .collect()
    }

    /// Raw `createInvoiceLink` request bodies
    pub async fn invoice_requests(&self) -> Vec<Value> {
        self.calls("createinvoicelink").await
    }
}
