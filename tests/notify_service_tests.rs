use mockito::{Matcher, Server};
use portfolio_tracker::{
    error::DispatchError,
    models::AlertConfig,
    services::notify_service::{Channel, ChannelCredentials, HttpDispatcher, NotificationDispatch},
};

fn telegram_config() -> AlertConfig {
    AlertConfig {
        telegram_bot_token: Some("123:abc".to_string()),
        telegram_chat_id: Some("42".to_string()),
        ..AlertConfig::default()
    }
}

#[tokio::test]
async fn connect_checks_the_bot_with_get_me() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/bot123:abc/getMe")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true,"result":{"id":1,"is_bot":true}}"#)
        .expect(1)
        .create_async()
        .await;

    let dispatcher = HttpDispatcher::new(server.url(), None);
    let creds = ChannelCredentials { bot_token: "123:abc".to_string(), chat_id: "42".to_string() };

    dispatcher.connect_channel(Channel::Telegram, &creds).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn connect_surfaces_telegram_rejection() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/botbad/getMe")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":false,"description":"Unauthorized"}"#)
        .create_async()
        .await;

    let dispatcher = HttpDispatcher::new(server.url(), None);
    let creds = ChannelCredentials { bot_token: "bad".to_string(), chat_id: "42".to_string() };

    let err = dispatcher.connect_channel(Channel::Telegram, &creds).await.unwrap_err();
    match err {
        DispatchError::Rejected { channel, reason } => {
            assert_eq!(channel, "Telegram");
            assert_eq!(reason, "Unauthorized");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn telegram_test_alert_posts_send_message() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/bot123:abc/sendMessage")
        .match_body(Matcher::PartialJsonString(r#"{"chat_id":"42"}"#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await;

    let dispatcher = HttpDispatcher::new(format!("{}/", server.url()), None);

    dispatcher
        .send_test_alert(Channel::Telegram, &telegram_config())
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn telegram_test_alert_needs_credentials() {
    let dispatcher = HttpDispatcher::new("http://127.0.0.1:9", None);

    let err = dispatcher
        .send_test_alert(Channel::Telegram, &AlertConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::MissingCredentials("Telegram")));
}

#[tokio::test]
async fn email_test_alert_goes_to_the_webhook() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/notify")
        .match_body(Matcher::PartialJsonString(
            r#"{"channel":"email","to":"me@example.com"}"#.to_string(),
        ))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let dispatcher = HttpDispatcher::new("http://127.0.0.1:9", Some(format!("{}/notify", server.url())));
    let config = AlertConfig {
        email_address: Some("me@example.com".to_string()),
        ..AlertConfig::default()
    };

    dispatcher.send_test_alert(Channel::Email, &config).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn webhook_failure_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/notify")
        .with_status(500)
        .create_async()
        .await;

    let dispatcher = HttpDispatcher::new("http://127.0.0.1:9", Some(format!("{}/notify", server.url())));

    let err = dispatcher
        .send_test_alert(Channel::Push, &AlertConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Http(_)));
}

#[tokio::test]
async fn push_without_webhook_is_unavailable() {
    let dispatcher = HttpDispatcher::new("http://127.0.0.1:9", None);

    let err = dispatcher
        .send_test_alert(Channel::Push, &AlertConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ChannelUnavailable("Push")));
}
