use actix_web::{get, patch, put, web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::Deserialize;
use serde_json::json;

use crate::applications;
use crate::applications::DecisionNote;
use crate::config::Config;
use crate::db::Database;
use crate::enums::{ApplicationStatus, Role};
use crate::error::ApiError;
use crate::token;

#[derive(Deserialize)]
pub struct CompanyStatusRequest {
    pub status: String,
    pub message: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Deserialize)]
pub struct AdminStatusRequest {
    pub status: String,
}

#[get("/api/applications/my-applications")]
pub async fn my_applications(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Student)?;

    let conn = db.conn()?;
    let applications = applications::for_student(&conn, claims.id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "applications": applications })))
}

#[get("/api/applications")]
pub async fn list_applications(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let applications = applications::list_all_admin(&conn)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "applications": applications })))
}

#[get("/api/applications/company")]
pub async fn company_applications(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Company)?;

    let conn = db.conn()?;
    let applications = applications::for_company(&conn, claims.id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "applications": applications })))
}

/// A company may only hand down the two terminal decisions, and only on
/// applications filed against its own postings. The optional message rides
/// in the same transaction as the status change.
#[patch("/api/applications/company/{id}/status")]
pub async fn company_update_status(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<CompanyStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Company)?;
    let id = path.into_inner();

    let status: ApplicationStatus = body.status.parse()?;
    if !status.is_company_decision() {
        return Err(ApiError::Validation(
            "Status must be either 'Hired' or 'Rejected'".to_string(),
        ));
    }

    let mut conn = db.conn()?;
    let student_id = applications::student_for_company_application(&conn, id, claims.id)?;
    let application = applications::set_status(
        &mut conn,
        id,
        status,
        Some(DecisionNote {
            company_id: claims.id,
            student_id,
            message: body.message.as_deref(),
            contact_email: body.contact_email.as_deref(),
        }),
    )?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Application status updated successfully",
        "application": application
    })))
}

/// Admin override: any valid status, no ownership or transition check.
#[put("/api/applications/{id}/status")]
pub async fn admin_update_status(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<AdminStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let status: ApplicationStatus = body.status.parse()?;
    let mut conn = db.conn()?;
    let application = applications::set_status(&mut conn, path.into_inner(), status, None)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Application status updated successfully",
        "application": application
    })))
}

#[get("/api/applications/stats")]
pub async fn application_stats(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let stats = applications::stats_admin(&conn)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "stats": stats })))
}

#[get("/api/applications/company/stats")]
pub async fn company_application_stats(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Company)?;

    let conn = db.conn()?;
    let stats = applications::stats_company(&conn, claims.id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "stats": stats })))
}

#[get("/api/applications/my-messages")]
pub async fn my_messages(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Student)?;

    let conn = db.conn()?;
    let messages = applications::messages_for_student(&conn, claims.id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "messages": messages })))
}
