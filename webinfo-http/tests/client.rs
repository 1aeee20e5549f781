use serde_json::{Value, json};
use webinfo_http::{HttpClient, HttpError, RequestOpts};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn get_bytes_returns_body_even_for_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<html><body>gone</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let url = format!("{}/missing", server.uri());
    let resp = client
        .get_bytes(
            &url,
            RequestOpts {
                allow_absolute: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(resp.status.as_u16(), 404);
    assert_eq!(resp.content_type(), Some("text/html; charset=utf-8"));
    assert_eq!(&resp.body[..], b"<html><body>gone</body></html>");
}

#[tokio::test]
async fn get_bytes_never_retries_a_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap().with_retries(3);
    let resp = client.get_bytes("busy", RequestOpts::default()).await.unwrap();
    assert_eq!(resp.status.as_u16(), 503);
}

#[tokio::test]
async fn server_errors_are_not_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "boom"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/v1/", server.uri())).unwrap();
    let err = client
        .post_json_opts::<_, Value>(
            "chat/completions",
            &json!({"x": 1}),
            RequestOpts {
                bearer: Some("sk-test"),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn retries_when_budget_allows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap().with_retries(1);
    let got: Value = client
        .post_json_opts("flaky", &json!({}), RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(got, json!({"ok": true}));
}

#[tokio::test]
async fn bearer_auth_is_sent_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/me"))
        .and(header("authorization", "Bearer sk-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let got: Value = client
        .post_json_opts(
            "me",
            &json!({}),
            RequestOpts {
                bearer: Some(" 'sk-abc' "),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(got["id"], 7);
}

#[tokio::test]
async fn undecodable_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .post_json_opts::<_, Value>("html", &json!({}), RequestOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Decode(_, ref snippet) if snippet.contains("not json")));
}
