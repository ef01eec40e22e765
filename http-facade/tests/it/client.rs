use std::{collections::HashMap, time::Duration};

use bytes::Bytes;
use futures::{TryStreamExt, stream};
use http_facade::{
    Body, BoxError, Client, Content, Error, Headers, HeadersValidation, Method, QueryArgs,
    ReqwestTransport, Request, Settings, StatusClass, StatusCode,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{body_string, header, method, path, query_param},
};

use crate::helper::TestHelper;

fn query_of(url: &http_facade::Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[tokio::test]
async fn get_merges_args_over_embedded_query() {
    let helper = TestHelper::new().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("x", "2"))
        .and(query_param("y", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("items"))
        .expect(1)
        .mount(&helper.mock_server)
        .await;

    let args = QueryArgs::from([
        ("x".to_string(), "2".to_string()),
        ("y".to_string(), "3".to_string()),
    ]);

    let mut response = helper
        .client
        .get(&helper.url("/items?x=1"), Some(&args), None)
        .await
        .unwrap();

    assert_eq!(response.status_code().unwrap(), StatusCode::OK);
    assert_eq!(response.read_as_text().await.unwrap(), "items");

    let received = helper.received().await;
    assert_eq!(received.len(), 1);
    assert_eq!(
        query_of(&received[0].url),
        HashMap::from([
            ("x".to_string(), "2".to_string()),
            ("y".to_string(), "3".to_string())
        ])
    );
}

#[tokio::test]
async fn error_statuses_are_valid_responses() {
    let helper = TestHelper::new().await;

    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&helper.mock_server)
        .await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&helper.mock_server)
        .await;
    Mock::given(path("/moved"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&helper.mock_server)
        .await;

    let missing = helper
        .client
        .get(&helper.url("/missing"), None, None)
        .await
        .unwrap();
    assert_eq!(missing.status_class().unwrap(), StatusClass::Error);

    let mut broken = helper
        .client
        .get(&helper.url("/broken"), None, None)
        .await
        .unwrap();
    assert_eq!(broken.status_class().unwrap(), StatusClass::Fault);
    assert_eq!(broken.read_as_text().await.unwrap(), "boom");

    let moved = helper
        .client
        .get(&helper.url("/moved"), None, None)
        .await
        .unwrap();
    assert_eq!(moved.status_class().unwrap(), StatusClass::Redirected);
}

#[tokio::test]
async fn unreachable_host_is_a_transport_failure() {
    crate::helper::init_tracing();

    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = Client::new(ReqwestTransport::builder().max_retries(0).build().unwrap());
    let err = client
        .get(&format!("http://127.0.0.1:{port}/"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TransportFailure { .. }));
}

#[tokio::test]
async fn every_convenience_method_sends_its_verb() {
    let helper = TestHelper::new().await;

    for verb in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD"] {
        Mock::given(method(verb))
            .and(path("/verbs"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&helper.mock_server)
            .await;
    }

    let url = helper.url("/verbs");
    let client = &helper.client;

    for response in [
        client.get(&url, None, None).await,
        client.post(&url, None, None, None).await,
        client.put(&url, None, None, None).await,
        client.patch(&url, None, None, None).await,
        client.delete(&url, None, None).await,
        client.options(&url, None, None, None).await,
        client.head(&url, None, None).await,
    ] {
        assert_eq!(response.unwrap().status_code().unwrap(), StatusCode::NO_CONTENT);
    }

    let mut verbs: Vec<String> = helper
        .received()
        .await
        .into_iter()
        .map(|r| r.method.to_string())
        .collect();
    verbs.sort();
    assert_eq!(
        verbs,
        ["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"]
    );
}

#[tokio::test]
async fn form_body_is_sent_url_encoded() {
    let helper = TestHelper::new().await;

    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("name=Ann+Lee&age=41"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&helper.mock_server)
        .await;

    let mut request = Request::new(Method::Post);
    request.set_url(&helper.url("/form")).unwrap();
    request.add_form_url_encoded_content("name", "Ann Lee");
    request.add_form_url_encoded_content("age", "41");

    let response = helper.client.perform_request(request).await.unwrap();

    assert_eq!(response.status_code().unwrap(), StatusCode::CREATED);
}

#[tokio::test]
async fn multipart_parts_arrive_in_order() {
    let helper = TestHelper::new().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&helper.mock_server)
        .await;

    let mut request = Request::new(Method::Post);
    request.set_url(&helper.url("/upload")).unwrap();
    request.add_multipart_text("name", "Ann");
    request.add_multipart_bytes("file", b"file-bytes".to_vec(), Some("a.txt"));

    helper.client.perform_request(request).await.unwrap();

    let received = helper.received().await;
    let content_type = received[0].headers["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));

    let body = String::from_utf8(received[0].body.clone()).unwrap();
    assert_eq!(body.matches("Content-Disposition").count(), 2);

    let name = body.find("name=\"name\"\r\n\r\nAnn\r\n").unwrap();
    let file = body.find("name=\"file\"; filename=\"a.txt\"").unwrap();
    assert!(name < file);
    assert!(body.contains("\r\n\r\nfile-bytes\r\n"));
}

#[tokio::test]
async fn streamed_multipart_part_is_sent() {
    let helper = TestHelper::new().await;

    Mock::given(method("PUT"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&helper.mock_server)
        .await;

    let chunks = vec![
        Ok::<_, BoxError>(Bytes::from_static(b"first-")),
        Ok(Bytes::from_static(b"second")),
    ];

    let mut request = Request::new(Method::Put);
    request.set_url(&helper.url("/stream")).unwrap();
    request.add_multipart_stream("log", stream::iter(chunks), Some("log.txt"));

    helper.client.perform_request(request).await.unwrap();

    let received = helper.received().await;
    let body = String::from_utf8(received[0].body.clone()).unwrap();
    assert!(body.contains("filename=\"log.txt\""));
    assert!(body.contains("first-second"));
}

#[tokio::test]
async fn explicit_headers_override_body_content_type() {
    let helper = TestHelper::new().await;

    Mock::given(method("POST"))
        .and(path("/json"))
        .and(header("content-type", "application/vnd.api+json"))
        .and(header("x-trace", "abc"))
        .and(body_string(r#"{"id":1}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
        .expect(1)
        .mount(&helper.mock_server)
        .await;

    let headers = Headers::from([
        ("Content-Type".to_string(), "application/vnd.api+json".to_string()),
        ("x-trace".to_string(), "abc".to_string()),
    ]);
    let body = Body::Raw(Content::json(&serde_json::json!({ "id": 1 })).unwrap());

    let mut response = helper
        .client
        .post(&helper.url("/json"), None, Some(&headers), Some(body))
        .await
        .unwrap();

    let value: serde_json::Value = response.read_as_json().await.unwrap();
    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn invalid_headers_follow_validation_mode() {
    let helper = TestHelper::new().await;

    Mock::given(path("/headers"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&helper.mock_server)
        .await;

    let headers = Headers::from([
        ("bad header".to_string(), "x".to_string()),
        ("x-good".to_string(), "y".to_string()),
    ]);
    let url = helper.url("/headers");

    let err = helper
        .client
        .get(&url, None, Some(&headers))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidHeader { .. }));

    let lenient = helper
        .client
        .clone()
        .with_headers_validation(HeadersValidation::No);
    lenient.get(&url, None, Some(&headers)).await.unwrap();

    let received = helper.received().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].headers["x-good"], "y");
}

#[tokio::test]
async fn settings_timeout_fails_slow_responses() {
    let helper = TestHelper::new().await;

    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&helper.mock_server)
        .await;

    let settings = Settings {
        timeout: Some(Duration::from_millis(200)),
        max_retries: 0,
        ..Default::default()
    };
    let client = Client::from_settings(&settings).unwrap();

    let err = client
        .get(&helper.url("/slow"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TransportFailure { .. }));
}

#[tokio::test]
async fn settings_timeout_fails_slow_body_reads() {
    crate::helper::init_tracing();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Sends the head and part of the body, then stalls
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 10\r\n\r\nabc")
            .await
            .unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let settings = Settings {
        timeout: Some(Duration::from_millis(300)),
        max_retries: 0,
        ..Default::default()
    };
    let client = Client::from_settings(&settings).unwrap();

    let mut response = client
        .get(&format!("http://{addr}/"), None, None)
        .await
        .unwrap();
    assert_eq!(response.status_code().unwrap(), StatusCode::OK);

    let err = response.read_as_bytes().await.unwrap_err();
    assert!(err.is_transport_failure());

    let err = response.read_as_bytes().await.unwrap_err();
    assert!(matches!(err, Error::BodyUnavailable { .. }));
}

#[tokio::test]
async fn settings_user_agent_is_sent() {
    let helper = TestHelper::new().await;

    Mock::given(path("/agent"))
        .and(header("user-agent", "facade-test/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&helper.mock_server)
        .await;

    let settings = Settings {
        user_agent: Some("facade-test/1.0".into()),
        max_retries: 0,
        ..Default::default()
    };
    let client = Client::from_settings(&settings).unwrap();

    let response = client
        .get(&helper.url("/agent"), None, None)
        .await
        .unwrap();

    assert_eq!(response.status_code().unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn into_stream_yields_the_whole_body() {
    let helper = TestHelper::new().await;
    let payload = "x".repeat(64 * 1024);

    Mock::given(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_string(payload.clone()))
        .mount(&helper.mock_server)
        .await;

    let response = helper
        .client
        .get(&helper.url("/large"), None, None)
        .await
        .unwrap();

    let chunks: Vec<Bytes> = response.into_stream().unwrap().try_collect().await.unwrap();

    assert_eq!(chunks.concat(), payload.as_bytes());
}

#[tokio::test]
async fn response_exposes_headers_and_final_url() {
    let helper = TestHelper::new().await;

    Mock::given(path("/meta"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-request-id", "42"))
        .mount(&helper.mock_server)
        .await;

    let response = helper
        .client
        .get(&helper.url("/meta"), None, None)
        .await
        .unwrap();

    assert_eq!(response.headers().unwrap()["x-request-id"], "42");
    assert_eq!(response.url().unwrap().path(), "/meta");
    assert_eq!(response.raw_result().unwrap().status, StatusCode::OK);
}
