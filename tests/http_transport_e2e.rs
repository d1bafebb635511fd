use httpmock::prelude::*;
use reelpack::config::Config;
use reelpack::transfer::{
    ARCHIVE_CONTENT_TYPE, ArchiveArtifact, HttpTransport, TransferProgress, UploadRequest,
    UploadTransport,
};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

const UPLOAD_PATH: &str = "/projects/42/upload-folder/";

fn transport(endpoint: String, cookie: Option<&str>, retries: usize) -> HttpTransport {
    let client = reqwest::blocking::Client::builder().no_proxy().build().unwrap();
    let config = Config { max_retries: retries, ..Config::default() };
    HttpTransport::with_client(client, &config, endpoint, cookie.map(str::to_string)).unwrap()
}

fn request(group: &str) -> UploadRequest {
    UploadRequest {
        artifact: ArchiveArtifact {
            group_name: group.to_string(),
            file_name: format!("{}.zip", group),
            content_type: ARCHIVE_CONTENT_TYPE,
            bytes: b"PK\x03\x04 not really a zip but bytes are bytes".to_vec().into(),
            entries: 1,
        },
        group_name: group.to_string(),
        csrf_token: "tok-123".to_string(),
        metadata: Some(r#"{"intro":["a.mp4"]}"#.to_string()),
    }
}

fn no_progress() -> TransferProgress {
    Arc::new(|_: u64, _: u64| {})
}

#[test]
fn test_post_carries_token_cookie_and_form_fields() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(UPLOAD_PATH)
            .header("x-csrftoken", "tok-123")
            .header("cookie", "sessionid=s1; csrftoken=tok-123")
            .header_exists("content-type")
            .body_contains(r#"name="zip_file"; filename="intro.zip""#)
            .body_contains("application/zip")
            .body_contains(r#"name="folder_name""#)
            .body_contains("\r\n\r\nintro\r\n")
            .body_contains(r#"name="directory_structure""#)
            .body_contains(r#"{"intro":["a.mp4"]}"#);
        then.status(200).json_body(serde_json::json!({"success": true}));
    });

    let t = transport(server.url(UPLOAD_PATH), Some("sessionid=s1; csrftoken=tok-123"), 1);
    let outcome = t.upload(request("intro"), &no_progress());
    mock.assert();
    assert!(outcome.success, "{:?}", outcome);
}

#[test]
fn test_explicit_server_error_becomes_failed_outcome() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(UPLOAD_PATH).body_contains(r#"filename="outro.zip""#);
        then.status(200).json_body(serde_json::json!({"success": false, "error": "quota exceeded"}));
    });
    let outcome = transport(server.url(UPLOAD_PATH), None, 1).upload(request("outro"), &no_progress());
    mock.assert();
    assert!(!outcome.success);
    assert_eq!(outcome.error_message.as_deref(), Some("quota exceeded"));
}

#[test]
fn test_http_500_is_not_retried() {
    reelpack::util::set_backoff_ms(1);
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/upload/");
        then.status(500).body("<h1>Server Error</h1>");
    });
    let outcome = transport(server.url("/upload/"), None, 3).upload(request("intro"), &no_progress());
    assert!(!outcome.success);
    assert!(outcome.error_message.unwrap().contains("500"));
    assert_eq!(mock.hits(), 1);
}

#[test]
fn test_falsy_flag_on_error_status_names_the_status() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/upload/");
        then.status(400).json_body(serde_json::json!({"success": false}));
    });
    let outcome = transport(server.url("/upload/"), None, 1).upload(request("intro"), &no_progress());
    mock.assert();
    assert_eq!(outcome.error_message.as_deref(), Some("Upload failed with HTTP status 400"));
}

#[test]
fn test_redirect_url_and_full_progress() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(UPLOAD_PATH);
        then.status(200)
            .json_body(serde_json::json!({"success": true, "redirect_url": "/projects/42/"}));
    });
    let seen: Arc<Mutex<Vec<(u64, u64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: TransferProgress =
        Arc::new(move |l: u64, t: u64| sink.lock().unwrap().push((l, t)));
    let req = request("intro");
    let len = req.artifact.len();
    let outcome = transport(server.url(UPLOAD_PATH), None, 1).upload(req, &progress);
    mock.assert();
    assert_eq!(outcome.redirect_url.as_deref(), Some("/projects/42/"));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.last().copied(), Some((len, len)));
}

// The mock server always answers, so a connection that dies mid-request needs
// a raw listener: the first connection is dropped, the second gets a 200.
#[test]
fn test_dropped_connection_is_retried_then_succeeds() {
    reelpack::util::set_backoff_ms(1);
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (first, _) = listener.accept().unwrap();
        drop(first);
        let (mut stream, _) = listener.accept().unwrap();
        // the multipart body has a known length, so read up to Content-Length
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_lowercase();
            if let Some(end) = text.find("\r\n\r\n") {
                let len = text[..end]
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .unwrap();
    });
    let endpoint = format!("http://{}/upload/", addr);
    let outcome = transport(endpoint, None, 2).upload(request("intro"), &no_progress());
    server.join().unwrap();
    assert!(outcome.success, "{:?}", outcome);
}

#[test]
fn test_unreachable_endpoint_is_network_error_outcome() {
    reelpack::util::set_backoff_ms(1);
    let addr = {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap()
    };
    let endpoint = format!("http://{}/upload/", addr);
    let outcome = transport(endpoint, None, 2).upload(request("intro"), &no_progress());
    assert!(!outcome.success);
    assert!(outcome.error_message.unwrap().starts_with("Network error"));
}

#[test]
fn test_custom_header_name_from_config() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/upload/").header("x-xsrf-token", "tok-123");
        then.status(200);
    });
    let client = reqwest::blocking::Client::builder().no_proxy().build().unwrap();
    let config = Config { csrf_header_name: "X-XSRF-TOKEN".into(), ..Config::default() };
    let t = HttpTransport::with_client(client, &config, server.url("/upload/"), None).unwrap();
    assert!(t.upload(request("intro"), &no_progress()).success);
    mock.assert();
}
