//! Webhook sink delivery tests against a local mock endpoint.

use url::Url;
use webhook_notify::{Field, Footer, Message, NotifyError, WebhookSink};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_message() -> Message {
    Message {
        content: None,
        title: "Stock Levels".to_string(),
        fields: vec![
            Field {
                name: "Total Stock".to_string(),
                value: "8".to_string(),
                inline: false,
            },
            Field {
                name: "Store A (1)".to_string(),
                value: "5".to_string(),
                inline: true,
            },
        ],
        footer: Some(Footer {
            text: Some("via ref main".to_string()),
            url: None,
        }),
    }
}

#[tokio::test]
async fn delivers_embed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({
            "embeds": [{
                "title": "Stock Levels",
                "fields": [
                    { "name": "Total Stock", "value": "8", "inline": false },
                    { "name": "Store A (1)", "value": "5", "inline": true }
                ],
                "footer": { "text": "via ref main" }
            }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = Url::parse(&format!("{}/hook", server.uri())).unwrap();
    let sink = WebhookSink::new(endpoint).unwrap();
    sink.send(&sample_message()).await.unwrap();
}

#[tokio::test]
async fn mention_rides_as_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "content": "<@123>" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut message = sample_message();
    message.content = Some("<@123>".to_string());

    let endpoint = Url::parse(&server.uri()).unwrap();
    let sink = WebhookSink::new(endpoint).unwrap();
    sink.send(&message).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let endpoint = Url::parse(&server.uri()).unwrap();
    let sink = WebhookSink::new(endpoint).unwrap();
    let err = sink.send(&sample_message()).await.unwrap_err();
    assert!(matches!(err, NotifyError::Status { status: 429 }));
}
