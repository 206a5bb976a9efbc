#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use serial_test::serial;
use startives::auth::{create_jwt, hash_password};
use startives::models::NewUser;
use startives::repo::inmem::InMemRepo;
use startives::repo::UserRepo;
use startives::routes::{config, AppState};
use startives::storage::FsFileStore;
use std::sync::Arc;

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    std::env::set_var("STARTIVES_DATA_DIR", tempfile::tempdir().unwrap().path());
    std::env::set_var("STARTIVES_UPLOAD_DIR", tempfile::tempdir().unwrap().path());
}

// Minimal valid 1x1 PNG
fn png_bytes() -> Vec<u8> {
    vec![
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A,
        0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89,
        0x00, 0x00, 0x00, 0x0A, b'I', b'D', b'A', b'T', 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4,
        0x00, 0x00, 0x00, 0x00, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82,
    ]
}

fn multipart_body(boundary: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body: Vec<u8> = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

async fn seed_token(repo: &InMemRepo) -> String {
    let user = repo
        .create_user(NewUser {
            name: "U".into(),
            email: "u@example.com".into(),
            password_hash: hash_password("password123").unwrap(),
        })
        .await
        .unwrap();
    create_jwt(user.id, &user.email).unwrap()
}

#[actix_web::test]
#[serial]
async fn upload_roundtrip_and_idempotence() {
    setup_env();
    let repo = InMemRepo::new();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                file_store: Arc::new(FsFileStore::new()),
                rate_limiter: None,
            }))
            .configure(config),
    )
    .await;
    let token = seed_token(&repo).await;
    let boundary = "BOUNDARYHASH";

    let req = test::TestRequest::post()
        .uri("/api/v1/upload")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={boundary}")))
        .set_payload(multipart_body(boundary, &png_bytes()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let uploaded: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(uploaded["mime"], "image/png");
    assert_eq!(uploaded["duplicate"], false);
    let hash = uploaded["hash"].as_str().unwrap().to_string();

    // identical bytes answer 200 with duplicate=true
    let req = test::TestRequest::post()
        .uri("/api/v1/upload")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={boundary}")))
        .set_payload(multipart_body(boundary, &png_bytes()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let again: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(again["hash"].as_str(), Some(hash.as_str()));
    assert_eq!(again["duplicate"], true);

    // fetch by hash, content-type sniffed
    let req = test::TestRequest::get().uri(&format!("/uploads/{hash}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let ct = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert_eq!(ct, "image/png");
    let body = test::read_body(resp).await;
    assert_eq!(body.to_vec(), png_bytes());
}

#[actix_web::test]
#[serial]
async fn upload_rejects_unknown_content_and_requires_auth() {
    setup_env();
    let repo = InMemRepo::new();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                file_store: Arc::new(FsFileStore::new()),
                rate_limiter: None,
            }))
            .configure(config),
    )
    .await;
    let token = seed_token(&repo).await;
    let boundary = "BOUNDARYHASH";

    // plain text is not on the allow list
    let req = test::TestRequest::post()
        .uri("/api/v1/upload")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={boundary}")))
        .set_payload(multipart_body(boundary, b"just some text"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 415);

    // anonymous upload is rejected
    let req = test::TestRequest::post()
        .uri("/api/v1/upload")
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={boundary}")))
        .set_payload(multipart_body(boundary, &png_bytes()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // unknown hash 404s
    let req = test::TestRequest::get().uri("/uploads/deadbeef").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
