//! Verifiers that talk to remote services, exercised against a local stub.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tollgate_auth::{BuiltinVerifier, JwksKeySource, KeySource, RemoteVerifier};
use tollgate_core::{AuthFailure, IdentityVerifier};

const JWKS_SECRET: &[u8] = b"jwks-test-secret-key-123";
const JWKS_SECRET_B64URL: &str = "andrcy10ZXN0LXNlY3JldC1rZXktMTIz";

/// Starts a stub HTTP server. Returns its base URL and a hit counter.
async fn stub<F>(respond: F) -> (String, Arc<AtomicUsize>)
where
    F: Fn(&str, &Bytes) -> (StatusCode, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let respond = Arc::new(respond);

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let respond = respond.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let respond = respond.clone();
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let path = req.uri().path().to_string();
                        let body = req.into_body().collect().await.unwrap().to_bytes();
                        let (status, text) = respond(&path, &body);
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .header("content-type", "application/json")
                                .body(Full::new(Bytes::from(text)))
                                .unwrap(),
                        )
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (format!("http://{addr}"), hits)
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn signed_with_kid(kid: &str) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(
        &header,
        &json!({
            "sub": "jwks-user",
            "aud": "games-client",
            "iss": "https://accounts.google.com",
            "exp": now() + 600,
        }),
        &EncodingKey::from_secret(JWKS_SECRET),
    )
    .unwrap()
}

fn jwks_body() -> String {
    json!({
        "keys": [{ "kty": "oct", "kid": "k1", "alg": "HS256", "k": JWKS_SECRET_B64URL }]
    })
    .to_string()
}

#[tokio::test]
async fn remote_verifier_accepts_confirmed_credential() {
    let (base, hits) = stub(|path, body| {
        let request: serde_json::Value = serde_json::from_slice(body).unwrap();
        if path == "/verify" && request["idToken"] == "aaa.bbb.ccc" {
            (
                StatusCode::OK,
                json!({"sub": "u-7", "email": "u7@example.com", "authProvider": "toto"})
                    .to_string(),
            )
        } else {
            (StatusCode::NOT_FOUND, "{}".to_string())
        }
    })
    .await;

    let verifier = RemoteVerifier::new("toto", &base, Duration::from_secs(5)).unwrap();
    let identity = verifier.verify("aaa.bbb.ccc").await.unwrap();

    assert_eq!(identity.subject_id(), "u-7");
    assert_eq!(identity.email(), Some("u7@example.com"));
    assert_eq!(identity.provider_tag(), "toto");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remote_verifier_maps_refusal_to_rejected() {
    let (base, _) = stub(|_, _| (StatusCode::UNAUTHORIZED, "{}".to_string())).await;
    let verifier = RemoteVerifier::new("toto", &base, Duration::from_secs(5)).unwrap();

    let err = verifier.verify("aaa.bbb.ccc").await.unwrap_err();
    assert!(matches!(err, AuthFailure::Rejected(_)));
}

#[tokio::test]
async fn remote_verifier_maps_server_error_to_unavailable() {
    let (base, _) = stub(|_, _| (StatusCode::BAD_GATEWAY, "{}".to_string())).await;
    let verifier = RemoteVerifier::new("toto", &base, Duration::from_secs(5)).unwrap();

    let err = verifier.verify("aaa.bbb.ccc").await.unwrap_err();
    assert!(matches!(err, AuthFailure::Unavailable(_)));
}

#[tokio::test]
async fn jwks_keys_are_fetched_once_and_cached() {
    let (base, hits) = stub(|_, _| (StatusCode::OK, jwks_body())).await;
    let keys = JwksKeySource::new(format!("{base}/certs"));
    let verifier = BuiltinVerifier::new("games-client", keys).with_algorithms([Algorithm::HS256]);

    let token = signed_with_kid("k1");
    let first = verifier.verify(&token).await.unwrap();
    let second = verifier.verify(&token).await.unwrap();

    assert_eq!(first.subject_id(), "jwks-user");
    assert_eq!(first, second);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn jwks_unknown_kid_does_not_refetch_immediately() {
    let (base, hits) = stub(|_, _| (StatusCode::OK, jwks_body())).await;
    let keys = JwksKeySource::new(format!("{base}/certs"));
    let verifier = BuiltinVerifier::new("games-client", keys).with_algorithms([Algorithm::HS256]);

    verifier.verify(&signed_with_kid("k1")).await.unwrap();
    let err = verifier.verify(&signed_with_kid("k9")).await.unwrap_err();

    assert!(matches!(err, AuthFailure::Rejected(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn jwks_keys_are_refetched_after_ttl() {
    let (base, hits) = stub(|_, _| (StatusCode::OK, jwks_body())).await;
    let keys = JwksKeySource::new(format!("{base}/certs")).with_ttl(Duration::from_millis(50));

    assert!(keys.decoding_key(Some("k1")).await.is_ok());
    assert!(keys.decoding_key(Some("k1")).await.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(keys.decoding_key(Some("k1")).await.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn jwks_cache_holds_at_most_32_keys() {
    let (base, _) = stub(|_, _| {
        let keys: Vec<_> = (0..40)
            .map(|i| json!({ "kty": "oct", "kid": format!("k{i}"), "alg": "HS256", "k": JWKS_SECRET_B64URL }))
            .collect();
        (StatusCode::OK, json!({ "keys": keys }).to_string())
    })
    .await;
    let keys = JwksKeySource::new(format!("{base}/certs"));

    let _ = keys.decoding_key(Some("k0")).await;
    assert_eq!(keys.cached_key_count(), 32);
}
