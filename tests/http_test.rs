use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use trailmap::cdn::{HttpInvalidator, Invalidator};
use trailmap::error::{CdnError, StoreError};
use trailmap::storage::{HttpStore, ObjectStore};

/// Answers one request per connection with the given `(status, body)` pairs,
/// in order. The handle yields every raw request received.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut socket).await);
            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
        requests
    });

    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            let length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < end + 4 + length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            return String::from_utf8_lossy(&buf).into_owned();
        }
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return String::from_utf8_lossy(&buf).into_owned();
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn request_line(request: &str) -> &str {
    request.lines().next().unwrap_or_default()
}

const FIRST_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>tracks</Name>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>page2</NextContinuationToken>
  <Contents><Key>Hiking/Alps/Ridge.gpx</Key></Contents>
</ListBucketResult>"#;

const SECOND_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>tracks</Name>
  <IsTruncated>false</IsTruncated>
  <Contents><Key>Biking/Jura/Loop.gpx</Key></Contents>
</ListBucketResult>"#;

#[tokio::test]
async fn listing_follows_continuation_tokens() {
    let (base, server) = serve(vec![(200, FIRST_PAGE), (200, SECOND_PAGE)]).await;
    let store = HttpStore::new(client(), base, "tracks", Some("secret".into()));

    let keys = store.list().await.unwrap();
    assert_eq!(keys, ["Biking/Jura/Loop.gpx", "Hiking/Alps/Ridge.gpx"]);

    let requests = server.await.unwrap();
    assert_eq!(request_line(&requests[0]), "GET /tracks?list-type=2 HTTP/1.1");
    assert_eq!(
        request_line(&requests[1]),
        "GET /tracks?list-type=2&continuation-token=page2 HTTP/1.1"
    );
    assert!(
        requests[0]
            .to_lowercase()
            .contains("authorization: bearer secret")
    );
}

#[tokio::test]
async fn forbidden_get_is_a_status_error() {
    let (base, server) = serve(vec![(403, "denied")]).await;
    let store = HttpStore::new(client(), base, "tracks", None);

    let err = store.get("Hiking/Alps/Ridge.gpx").await.unwrap_err();
    assert!(
        matches!(err, StoreError::Status { status: 403, ref url } if url.ends_with("/tracks/Hiking/Alps/Ridge.gpx")),
        "got {err:?}"
    );
    server.await.unwrap();
}

#[tokio::test]
async fn put_sends_content_type_and_body() {
    let (base, server) = serve(vec![(200, ""), (403, "read only")]).await;
    let store = HttpStore::new(client(), base, "site", None);

    store
        .put("map.html", b"<html></html>".to_vec(), "text/html")
        .await
        .unwrap();
    let err = store
        .put("map.html", b"<html></html>".to_vec(), "text/html")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Status { status: 403, .. }));

    let requests = server.await.unwrap();
    assert_eq!(request_line(&requests[0]), "PUT /site/map.html HTTP/1.1");
    assert!(requests[0].to_lowercase().contains("content-type: text/html"));
    assert!(requests[0].ends_with("\r\n\r\n<html></html>"));
}

#[tokio::test]
async fn purge_posts_paths_and_reports_the_response() {
    let (base, server) = serve(vec![(200, r#"{"id":"purge-1"}"#)]).await;
    let cdn = HttpInvalidator::new(client(), format!("{base}/purge"), Some("cdn-token".into()));

    let summary = cdn.invalidate(&["/map.html".to_string()]).await.unwrap();
    assert_eq!(summary, r#"200 {"id":"purge-1"}"#);

    let requests = server.await.unwrap();
    let request = &requests[0];
    assert_eq!(request_line(request), "POST /purge HTTP/1.1");
    assert!(request.to_lowercase().contains("authorization: bearer cdn-token"));
    assert!(request.contains(r#""paths":["/map.html"]"#));
    assert!(request.contains(r#""caller_reference":"trailmap-"#));
}

#[tokio::test]
async fn purge_rejection_is_an_error() {
    let (base, server) = serve(vec![(503, "try later")]).await;
    let cdn = HttpInvalidator::new(client(), format!("{base}/purge"), None);

    let err = cdn.invalidate(&["/map.html".to_string()]).await.unwrap_err();
    match err {
        CdnError::Status { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "try later");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.await.unwrap();
}
