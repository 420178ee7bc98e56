/*
Copyright 2022 Daniel Brotsky. All rights reserved.

All of the copyrighted work in this repository is licensed under the
GNU Affero General Public License, reproduced in the LICENSE-AGPL file.

Attribution:

Some source files in this repository are derived from files in two Adobe Open
Source projects: the Adobe License Decoder repository found at this URL:
    https://github.com/adobe/adobe-license-decoder.rs
and the FRL Online Proxy repository found at this URL:
    https://github.com/adobe/frl-online-proxy

The files in those original works are copyright 2022 Adobe and the use of those
materials in this work is permitted by the MIT license under which they were
released.  That license is reproduced here in the LICENSE-MIT file.
*/
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use httpmock::prelude::*;
use plist::{Dictionary, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use ipa_base::{plist_encode, FailureKind};
use ipa_store::{
    DeviceFamily, Endpoints, NetConfig, PurchaseOutcome, StoreClient, CODE_REQUIRED_MESSAGE,
    STORE_USER_AGENT,
};

const AUTH_PATH: &str = "/WebObjects/MZFinance.woa/wa/authenticate";
const DOWNLOAD_PATH: &str = "/WebObjects/MZFinance.woa/wa/volumeStoreDownloadProduct";
const PURCHASE_PATH: &str = "/WebObjects/MZBuy.woa/wa/buyProduct";

fn test_client(server: &MockServer) -> StoreClient {
    let config = NetConfig { retry_delay_ms: 10, ..NetConfig::default() };
    StoreClient::with_guid(Endpoints::uniform(&server.base_url()), config, "0A1B2C3D4E5F")
        .expect("Can't build client")
}

fn plist_body(pairs: Vec<(&str, Value)>) -> Vec<u8> {
    let mut dict = Dictionary::new();
    for (k, v) in pairs {
        dict.insert(k.to_string(), v);
    }
    plist_encode(&dict).expect("Can't encode body")
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

fn failure_body(code: &str, message: &str) -> Vec<u8> {
    plist_body(vec![("failureType", string(code)), ("customerMessage", string(message))])
}

fn auth_success_body() -> Vec<u8> {
    let mut address = Dictionary::new();
    address.insert("firstName".to_string(), string("Jane"));
    address.insert("lastName".to_string(), string("Appleseed"));
    let mut account = Dictionary::new();
    account.insert("appleId".to_string(), string("jane@example.com"));
    account.insert("address".to_string(), Value::Dictionary(address));
    plist_body(vec![
        ("accountInfo", Value::Dictionary(account)),
        ("dsPersonId", Value::Integer(12345678i64.into())),
        ("passwordToken", string("token-abc")),
        ("pings", Value::Array(vec![])),
    ])
}

fn item_body(sinf_ids: &[i64]) -> Vec<u8> {
    let mut metadata = Dictionary::new();
    metadata.insert("bundleDisplayName".to_string(), string("Example"));
    metadata.insert("bundleShortVersionString".to_string(), string("1.0"));
    metadata.insert("softwareVersionBundleId".to_string(), string("com.example.app"));
    let sinfs = sinf_ids
        .iter()
        .map(|id| {
            let mut sinf = Dictionary::new();
            sinf.insert("id".to_string(), Value::Integer((*id).into()));
            sinf.insert("sinf".to_string(), Value::Data(vec![1, 2, 3]));
            Value::Dictionary(sinf)
        })
        .collect();
    let mut item = Dictionary::new();
    item.insert("URL".to_string(), string("https://example.com/Example.ipa"));
    item.insert("md5".to_string(), string("d41d8cd98f00b204e9800998ecf8427e"));
    item.insert("sinfs".to_string(), Value::Array(sinfs));
    item.insert("metadata".to_string(), Value::Dictionary(metadata));
    plist_body(vec![("songList", Value::Array(vec![Value::Dictionary(item)]))])
}

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(AUTH_PATH)
                .query_param("guid", "0A1B2C3D4E5F")
                .header("user-agent", STORE_USER_AGENT)
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains("<key>attempt</key>")
                .body_contains("<integer>4</integer>")
                .body_contains("<string>signIn</string>");
            then.status(200)
                .header("set-cookie", "mz_at0=cookie-value; Path=/")
                .body(auth_success_body());
        })
        .await;
    let client = test_client(&server);
    let session = client
        .login("jane@example.com", "password", None, &CancellationToken::new())
        .await
        .expect("Login failed");
    mock.assert_hits_async(1).await;
    assert_eq!(session.display_name, "Jane Appleseed");
    assert_eq!(session.email, "jane@example.com");
    assert_eq!(session.directory_service_id, "12345678");
    assert_eq!(session.password_token, "token-abc");
    assert_eq!(session.cookies, vec!["mz_at0=cookie-value; Path=/".to_string()]);
}

#[tokio::test]
async fn test_login_retries_invalid_credentials_once() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(AUTH_PATH);
            then.status(200).body(failure_body("-5000", "Your Apple ID or password was incorrect"));
        })
        .await;
    let client = test_client(&server);
    let err = client
        .login("jane@example.com", "wrong", None, &CancellationToken::new())
        .await
        .expect_err("Login should fail");
    mock.assert_hits_async(2).await;
    assert_eq!(err.kind(), FailureKind::InvalidCredentials);
    assert_eq!(
        err.failure().expect("No failure record").customer_message,
        "Your Apple ID or password was incorrect"
    );
}

#[tokio::test]
async fn test_login_with_code_does_not_retry() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(AUTH_PATH)
                .body_contains("<string>wrong123456</string>")
                .body_contains("<integer>2</integer>");
            then.status(200).body(failure_body("-5000", "Incorrect"));
        })
        .await;
    let client = test_client(&server);
    let err = client
        .login("jane@example.com", "wrong", Some("123456"), &CancellationToken::new())
        .await
        .expect_err("Login should fail");
    mock.assert_hits_async(1).await;
    assert_eq!(err.kind(), FailureKind::InvalidCredentials);
}

#[tokio::test]
async fn test_login_code_required() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(AUTH_PATH);
            then.status(200).body(plist_body(vec![
                ("failureType", string("")),
                ("customerMessage", string(CODE_REQUIRED_MESSAGE)),
            ]));
        })
        .await;
    let client = test_client(&server);
    let err = client
        .login("jane@example.com", "password", None, &CancellationToken::new())
        .await
        .expect_err("Login should need a code");
    mock.assert_hits_async(1).await;
    assert_eq!(err.kind(), FailureKind::CodeRequired);
}

#[tokio::test]
async fn test_login_response_without_token_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(AUTH_PATH);
            then.status(200).body(plist_body(vec![("dsPersonId", string("1"))]));
        })
        .await;
    let client = test_client(&server);
    let err = client
        .login("jane@example.com", "password", None, &CancellationToken::new())
        .await
        .expect_err("Login should fail");
    assert_eq!(err.kind(), FailureKind::GenericError);
}

#[tokio::test]
async fn test_acquire_sends_identity_and_cookies() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(AUTH_PATH);
            then.status(200)
                .header("set-cookie", "mz_at0=cookie-value; Path=/")
                .body(auth_success_body());
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(DOWNLOAD_PATH)
                .query_param("guid", "0A1B2C3D4E5F")
                .header("x-dsid", "12345678")
                .header("icloud-dsid", "12345678")
                .header("cookie", "mz_at0=cookie-value")
                .body_contains("<string>896694807</string>");
            then.status(200).body(item_body(&[0]));
        })
        .await;
    let client = test_client(&server);
    let cancel = CancellationToken::new();
    let session = client.login("jane@example.com", "pw", None, &cancel).await.unwrap();
    let item = client
        .acquire("896694807", &session.directory_service_id, &cancel)
        .await
        .expect("Acquire failed");
    download.assert_hits_async(1).await;
    assert_eq!(item.url, "https://example.com/Example.ipa");
    assert_eq!(item.bundle_id().as_deref(), Some("com.example.app"));
    assert_eq!(item.signature().unwrap().bytes, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_restored_session_cookies_are_replayed() {
    let server = MockServer::start_async().await;
    let download = server
        .mock_async(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH).header("cookie", "itspod=25");
            then.status(200).body(item_body(&[0]));
        })
        .await;
    let client = test_client(&server);
    let session = ipa_base::Session {
        display_name: "Jane".to_string(),
        email: "jane@example.com".to_string(),
        password_token: "t".to_string(),
        directory_service_id: "1".to_string(),
        cookies: vec!["itspod=25; Path=/".to_string()],
    };
    client.restore_session(&session);
    client.acquire("1", "1", &CancellationToken::new()).await.expect("Acquire failed");
    download.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_acquire_failures() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH).body_contains("<string>1</string>");
            then.status(200).body(plist_body(vec![("songList", Value::Array(vec![]))]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH).body_contains("<string>2</string>");
            then.status(200).body(failure_body("9610", "License not found"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH).body_contains("<string>3</string>");
            then.status(200).body(failure_body("2034", "Sign in again"));
        })
        .await;
    let client = test_client(&server);
    let cancel = CancellationToken::new();
    let err = client.acquire("1", "42", &cancel).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidItem);
    let err = client.acquire("2", "42", &cancel).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidLicense);
    assert_eq!(err.failure().unwrap().customer_message, "License not found");
    let err = client.acquire("3", "42", &cancel).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::PasswordTokenExpired);
}

#[tokio::test]
async fn test_purchase_licensed() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(PURCHASE_PATH)
                .header("x-token", "token-abc")
                .header("x-apple-store-front", "143441-1")
                .header("x-dsid", "42")
                .body_contains("<string>Software-896694807</string>")
                .body_contains("<string>STDQ</string>");
            then.status(200).body(plist_body(vec![
                ("jingleDocType", string("purchaseSuccess")),
                ("status", Value::Integer(0i64.into())),
            ]));
        })
        .await;
    let client = test_client(&server);
    let outcome = client
        .purchase("896694807", "42", "token-abc", "us", &CancellationToken::new())
        .await
        .expect("Purchase failed");
    mock.assert_hits_async(1).await;
    assert_eq!(outcome, PurchaseOutcome::Licensed);
}

#[tokio::test]
async fn test_purchase_already_licensed_both_ways() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PURCHASE_PATH).body_contains("<string>111</string>");
            then.status(500).body("Internal Server Error");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PURCHASE_PATH).body_contains("<string>222</string>");
            then.status(200).body(failure_body("2019", "You already own this item"));
        })
        .await;
    let client = test_client(&server);
    let cancel = CancellationToken::new();
    let first = client.purchase("111", "42", "t", "US", &cancel).await.unwrap();
    assert!(matches!(first, PurchaseOutcome::AlreadyLicensed { .. }));
    let second = client.purchase("222", "42", "t", "US", &cancel).await.unwrap();
    assert_eq!(
        second,
        PurchaseOutcome::AlreadyLicensed { message: "You already own this item".to_string() }
    );
}

#[tokio::test]
async fn test_purchase_failures() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(PURCHASE_PATH);
            then.status(200).body(failure_body("2002", "Password changed"));
        })
        .await;
    let client = test_client(&server);
    let cancel = CancellationToken::new();
    let err = client.purchase("1", "42", "t", "ZZ", &cancel).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidCountry);
    mock.assert_hits_async(0).await;
    let err = client.purchase("1", "42", "t", "US", &cancel).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::PasswordChanged);
}

#[tokio::test]
async fn test_cancelled_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH);
            then.status(200).body(item_body(&[0]));
        })
        .await;
    let client = test_client(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client.acquire("1", "42", &cancel).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Cancelled);
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_transport_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = NetConfig { retry_delay_ms: 1, ..NetConfig::default() };
    let endpoints = Endpoints::uniform(&format!("http://127.0.0.1:{}", port));
    let client = StoreClient::with_guid(endpoints, config, "GUID").unwrap();
    let err = client.acquire("1", "42", &CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransportError);
}

#[tokio::test]
async fn test_catalog_search_and_lookup() {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("term", "example")
                .query_param("limit", "5")
                .query_param("country", "US")
                .query_param("entity", "iPadSoftware")
                .query_param("media", "software");
            then.status(200).json_body(serde_json::json!({
                "resultCount": 1,
                "results": [{"trackId": 896694807, "trackName": "Example",
                    "bundleId": "com.example.app", "version": "1.0", "price": 0.0}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/lookup").query_param("bundleId", "com.example.none");
            then.status(200).json_body(serde_json::json!({"resultCount": 0, "results": []}));
        })
        .await;
    let client = test_client(&server);
    let cancel = CancellationToken::new();
    let results = client.search("example", 5, "US", DeviceFamily::Ipad, &cancel).await.unwrap();
    search.assert_hits_async(1).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].track_id, 896694807);
    let found = client
        .lookup("com.example.none", "US", DeviceFamily::Iphone, &cancel)
        .await
        .unwrap();
    assert!(found.is_none());
}

/// A bare server whose first `stalls` connections are accepted and then
/// never answered, so the client times out on them.  Later connections
/// get a 200 response carrying `body`.  Returns the base URL and a count
/// of accepted connections.
async fn stalling_server(stalls: usize, body: Vec<u8>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Can't bind listener");
    let addr = listener.local_addr().expect("No local address");
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut stalled = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            if counter.fetch_add(1, Ordering::SeqCst) < stalls {
                stalled.push(socket);
                continue;
            }
            read_request(&mut socket).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{}", addr), accepted)
}

async fn read_request(socket: &mut TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
        if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                return;
            }
        }
    }
}

fn impatient_client(base_url: &str) -> StoreClient {
    let config = NetConfig { timeout_secs: 1, retry_delay_ms: 10, ..NetConfig::default() };
    StoreClient::with_guid(Endpoints::uniform(base_url), config, "0A1B2C3D4E5F")
        .expect("Can't build client")
}

#[tokio::test]
async fn test_timeouts_are_retried_a_bounded_number_of_times() {
    let (base_url, accepted) = stalling_server(usize::MAX, Vec::new()).await;
    let client = impatient_client(&base_url);
    let err = client.acquire("1", "42", &CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransportError);
    let retry_count = NetConfig::default().retry_count as usize;
    assert_eq!(accepted.load(Ordering::SeqCst), retry_count + 1);
}

#[tokio::test]
async fn test_request_recovers_after_one_timeout() {
    let (base_url, accepted) = stalling_server(1, item_body(&[0])).await;
    let client = impatient_client(&base_url);
    let item = client
        .acquire("1", "42", &CancellationToken::new())
        .await
        .expect("Retry should have succeeded");
    assert_eq!(item.signature().unwrap().bytes, vec![1, 2, 3]);
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_store_failures_are_not_retried() {
    let server = MockServer::start_async().await;
    let acquire = server
        .mock_async(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH);
            then.status(200).body(failure_body("9610", "License not found"));
        })
        .await;
    let purchase = server
        .mock_async(|when, then| {
            when.method(POST).path(PURCHASE_PATH);
            then.status(200).body(failure_body("2034", "Sign in again"));
        })
        .await;
    let client = test_client(&server);
    let cancel = CancellationToken::new();
    let err = client.acquire("1", "42", &cancel).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidLicense);
    acquire.assert_hits_async(1).await;
    let err = client.purchase("1", "42", "t", "US", &cancel).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::PasswordTokenExpired);
    purchase.assert_hits_async(1).await;
}
