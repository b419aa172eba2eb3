//! REST client against a local HTTP responder.

use hearth_gateway::rest::{CreateMessage, RestClient};
use hearth_gateway::{GatewayError, RestError};
use hearth_test::prelude::*;

fn client(server: &MockHttpServer) -> RestClient {
    RestClient::new("secret", &format!("{}/api", server.base_url()), 10)
}

#[tokio::test]
async fn gateway_url_gets_query_suffix() {
    let server = MockHttpServer::serve_once(200, r#"{"url":"wss://gateway.example.gg"}"#).await;
    let rest = client(&server);

    let url = rest.gateway_url().await.unwrap();
    assert_eq!(url, "wss://gateway.example.gg/?v=10&encoding=json");

    let request = server.request().await.to_lowercase();
    assert!(request.starts_with("get /api/v10/gateway/bot "));
    assert!(request.contains("authorization: bot secret"));
}

#[tokio::test]
async fn api_errors_carry_code_and_message() {
    let server =
        MockHttpServer::serve_once(401, r#"{"code":0,"message":"401: Unauthorized"}"#).await;
    let rest = client(&server);

    let err = rest.gateway_url().await.unwrap_err();
    match &err {
        RestError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(*status, 401);
            assert_eq!(*code, 0);
            assert_eq!(message, "401: Unauthorized");
        },
        other => panic!("expected an API error, got {other:?}"),
    }
    assert!(err.is_unauthorized());
    assert!(GatewayError::from(err).is_fatal());
}

#[tokio::test]
async fn send_message_posts_json() {
    let server = MockHttpServer::serve_once(
        200,
        r#"{"id":"m1","channel_id":"c1","content":"hello"}"#,
    )
    .await;
    let rest = client(&server);

    let message = rest
        .send_message(
            "c1",
            &CreateMessage {
                content: "hello".into(),
                tts: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(message.id, "m1");
    assert_eq!(message.content, "hello");

    let request = server.request().await;
    assert!(request.starts_with("POST /api/v10/channels/c1/messages "));
    assert!(request.contains(r#"{"content":"hello"}"#));
}

#[tokio::test]
async fn non_json_error_body_is_kept() {
    let server = MockHttpServer::serve_once(502, "upstream unavailable").await;
    let err = client(&server).gateway_url().await.unwrap_err();
    assert!(matches!(err, RestError::Api { status: 502, .. }));
}
