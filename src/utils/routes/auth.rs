use actix_web::{get, post, put, web, HttpResponse};
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
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[post("/api/auth/student/register")]
pub async fn register_student(
    db: web::Data<Database>,
    config: web::Data<Config>,
    body: web::Json<users::StudentRegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".to_string()));
    }
    let mut conn = db.conn()?;
    if users::email_exists(&conn, &body.email)? {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = enc::hash_password(&body.password)?;
    let user_id = users::register_student(&mut conn, &body, &password_hash)?;
    let token = token::issue(user_id, &body.email, Role::Student, &config.jwt_secret)?;
    let user = users::student_info(&conn, user_id)?;

    log::info!("registered student account {}", user_id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Student registered successfully",
        "token": token,
        "user": user
    })))
}

#[post("/api/auth/company/register")]
pub async fn register_company(
    db: web::Data<Database>,
    config: web::Data<Config>,
    body: web::Json<users::CompanyRegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".to_string()));
    }
    let mut conn = db.conn()?;
    if users::email_exists(&conn, &body.email)? {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = enc::hash_password(&body.password)?;
    let user_id = users::register_company(&mut conn, &body, &password_hash)?;
    let token = token::issue(user_id, &body.email, Role::Company, &config.jwt_secret)?;
    let user = users::company_info(&conn, user_id)?;

    log::info!("registered company account {} (pending approval)", user_id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Company registered successfully",
        "token": token,
        "user": user
    })))
}

/// Unified login. Unknown email and wrong password take the same path out,
/// and the company approval gate only fires after the password verifies —
/// an attacker without valid credentials cannot enumerate pending accounts.
#[post("/api/auth/login")]
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.conn()?;

    let account = users::find_by_email(&conn, &body.email)?;
    let (user_id, stored_hash, role) =
        account.ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;
    if !enc::verify_password(&body.password, &stored_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    if role == Role::Company && !users::company_is_approved(&conn, user_id)? {
        return Err(ApiError::Forbidden(
            "Company account not yet approved. Please wait for admin approval.".to_string(),
        ));
    }

    let token = token::issue(user_id, &body.email, role, &config.jwt_secret)?;
    let user = match role {
        Role::Student => users::student_info(&conn, user_id)?,
        Role::Company => users::company_info(&conn, user_id)?,
        Role::Admin => users::admin_info(&conn, user_id)?,
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "user": user
    })))
}

#[get("/api/auth/me")]
pub async fn me(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    let conn = db.conn()?;
    let user = match claims.role {
        Role::Student => users::student_info(&conn, claims.id)?,
        Role::Company => users::company_info(&conn, claims.id)?,
        Role::Admin => users::admin_info(&conn, claims.id)?,
    };
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": user })))
}

#[put("/api/auth/students/profile")]
pub async fn update_student_profile(
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
        "message": "Student profile updated successfully",
        "profile": profile
    })))
}

/// Resume upload is a stub: the request is acknowledged but no file is
/// stored anywhere.
#[post("/api/auth/students/resume")]
pub async fn upload_resume(
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Student)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Resume uploaded successfully"
    })))
}

#[put("/api/auth/company/profile")]
pub async fn update_company_profile(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    body: web::Json<users::CompanyProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Company)?;

    let conn = db.conn()?;
    let profile = users::update_company_profile(&conn, claims.id, &body)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Company profile updated successfully",
        "profile": profile
    })))
}
