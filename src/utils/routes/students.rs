use actix_web::{get, put, web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::db::Database;
use crate::enc;
use crate::enums::Role;
use crate::error::ApiError;
use crate::token;
use crate::users;

#[derive(Deserialize)]
pub struct PasswordChangeRequest {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[get("/api/students/profile")]
pub async fn get_profile(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Student)?;

    let conn = db.conn()?;
    let profile = users::student_profile_full(&conn, claims.id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "profile": profile })))
}

#[put("/api/students/profile")]
pub async fn update_profile(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    body: web::Json<users::StudentProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Student)?;

    let conn = db.conn()?;
    let profile = users::update_student_profile(&conn, claims.id, &body)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": profile
    })))
}

#[put("/api/students/password")]
pub async fn update_password(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    body: web::Json<PasswordChangeRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Student)?;
    if body.new_password.is_empty() {
        return Err(ApiError::Validation("New password is required".to_string()));
    }

    let conn = db.conn()?;
    let stored_hash = users::current_password_hash(&conn, claims.id, Role::Student)?;
    if !enc::verify_password(&body.current_password, &stored_hash) {
        return Err(ApiError::Validation("Current password is incorrect".to_string()));
    }

    let new_hash = enc::hash_password(&body.new_password)?;
    users::set_password(&conn, claims.id, &new_hash)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password updated successfully"
    })))
}

#[get("/api/students/{id}")]
pub async fn get_student(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let student = users::student_profile_full(&conn, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "student": student })))
}
