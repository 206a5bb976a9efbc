use actix_web::{dev::Payload, test, FromRequest};
use startives::auth::{create_jwt, hash_password, verify_password, Auth};
use std::env;

// Helper that guarantees a sufficiently long secret for tests.
fn set_secret() {
    env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

#[actix_web::test]
#[serial_test::serial]
async fn jwt_roundtrip_ok() {
    set_secret();
    let token = create_jwt(42, "founder@example.com").expect("token");
    // The Auth extractor is the public way to validate, so use it here.
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    let auth = Auth::from_request(&req, &mut pl).await.expect("extract");
    assert_eq!(auth.0.sub, 42);
    assert_eq!(auth.0.email, "founder@example.com");
    assert_eq!(auth.user_id(), 42);
}

#[actix_web::test]
#[serial_test::serial]
async fn extractor_rejects_invalid_token() {
    set_secret();
    let req = test::TestRequest::default()
        .insert_header(("Authorization", "Bearer notatoken"))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[actix_web::test]
#[serial_test::serial]
async fn extractor_rejects_missing_header() {
    set_secret();
    let req = test::TestRequest::default().to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[actix_web::test]
#[serial_test::serial]
async fn extractor_rejects_token_signed_with_other_secret() {
    set_secret();
    let token = create_jwt(7, "user@example.com").expect("token");
    env::set_var("JWT_SECRET", "a-completely-different-secret-32-bytes!");
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
    set_secret();
}

#[test]
async fn password_hash_roundtrip() {
    let hash = hash_password("hunter2hunter2").expect("hash");
    assert_ne!(hash, "hunter2hunter2");
    assert!(verify_password("hunter2hunter2", &hash));
    assert!(!verify_password("wrong-password", &hash));
}

#[test]
async fn verify_rejects_garbage_hash() {
    assert!(!verify_password("whatever", "not-a-phc-string"));
}
