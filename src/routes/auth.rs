use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{create_jwt, hash_password, verify_password, Auth};
use crate::error::ApiError;
use crate::models::{NewUser, UpdateProfile, UserProfile};
use crate::routes::{client_ip, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    // same shallow shape check the signup form performs
    let valid = email.len() >= 3
        && email.matches('@').count() == 1
        && !email.starts_with('@')
        && !email.ends_with('@');
    if !valid {
        return Err(ApiError::bad_request("invalid email address"));
    }
    Ok(email)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid name, email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_signup(&client_ip(&req)) {
            return Err(ApiError::RateLimited);
        }
    }
    let payload = payload.into_inner();
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    let email = normalize_email(&payload.email)?;
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }
    let password_hash = hash_password(&payload.password).map_err(|e| {
        log::error!("password hashing failed: {e}");
        ApiError::Internal
    })?;
    let user = data
        .repo
        .create_user(NewUser { name, email, password_hash })
        .await?;
    let token = create_jwt(user.id, &user.email).map_err(|_| ApiError::Internal)?;
    metrics::increment_counter!("startives_signups_total");
    Ok(HttpResponse::Created().json(AuthResponse { token, user: user.into() }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Unknown email or wrong password")
    )
)]
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let user = data
        .repo
        .find_user_by_email(&email)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }
    let token = create_jwt(user.id, &user.email).map_err(|_| ApiError::Internal)?;
    Ok(HttpResponse::Ok().json(AuthResponse { token, user: user.into() }))
}

pub async fn me(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = data.repo.get_user(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "Own profile", body = UserProfile),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_profile(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = data.repo.get_user(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/profile",
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn update_profile(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<UpdateProfile>,
) -> Result<HttpResponse, ApiError> {
    let upd = payload.into_inner();
    if let Some(name) = &upd.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("name must not be empty"));
        }
    }
    let user = data.repo.update_profile(auth.user_id(), upd).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}
