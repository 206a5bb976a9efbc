use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, PublicUser};
use crate::routes::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "Public profile", body = PublicUser),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    _auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let user = data.repo.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PublicUser::from(user)))
}
