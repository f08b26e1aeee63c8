use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::Deserialize;
use serde_json::json;

use crate::applications;
use crate::config::Config;
use crate::db::Database;
use crate::enums::{ApplicationStatus, Role};
use crate::error::ApiError;
use crate::internships;
use crate::token;
use crate::users;

#[derive(Deserialize)]
pub struct ApprovalRequest {
    pub is_approved: bool,
}

#[derive(Deserialize)]
pub struct AdminInternshipCreate {
    pub company_id: i64,
    #[serde(flatten)]
    pub internship: internships::InternshipPayload,
}

#[derive(Deserialize)]
pub struct UserStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

// ----- companies -----

#[get("/api/admin/companies")]
pub async fn list_companies(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let companies = users::list_companies(&conn)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "companies": companies })))
}

#[put("/api/admin/companies/{id}")]
pub async fn update_company(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<users::CompanyProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;
    let id = path.into_inner();

    let mut conn = db.conn()?;
    users::admin_update_company(&mut conn, id, &body)?;
    let company = users::company_info(&conn, id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Company updated successfully",
        "company": company
    })))
}

#[patch("/api/admin/companies/{id}/approval")]
pub async fn set_company_approval(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<ApprovalRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let company = users::set_company_approval(&conn, path.into_inner(), body.is_approved)?;
    let verdict = if body.is_approved { "approved" } else { "rejected" };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Company {} successfully", verdict),
        "company": company
    })))
}

#[delete("/api/admin/companies/{id}")]
pub async fn delete_company(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let mut conn = db.conn()?;
    users::delete_company(&mut conn, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Company deleted successfully"
    })))
}

// ----- internships -----

#[get("/api/admin/internships")]
pub async fn list_internships(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let internships = internships::list_all_admin(&conn)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "internships": internships })))
}

/// Admin-created postings skip the review queue.
#[post("/api/admin/internships")]
pub async fn create_internship(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    body: web::Json<AdminInternshipCreate>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let internship = internships::create(&conn, body.company_id, &body.internship, true)?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Internship created successfully",
        "internship": internship
    })))
}

#[put("/api/admin/internships/{id}")]
pub async fn update_internship(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<internships::InternshipPayload>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let internship = internships::admin_update(&conn, path.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Internship updated successfully",
        "internship": internship
    })))
}

#[patch("/api/admin/internships/{id}/approval")]
pub async fn set_internship_approval(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<ApprovalRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let internship = internships::set_approval(&conn, path.into_inner(), body.is_approved)?;
    let verdict = if body.is_approved { "approved" } else { "rejected" };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Internship {} successfully", verdict),
        "internship": internship
    })))
}

#[delete("/api/admin/internships/{id}")]
pub async fn delete_internship(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let mut conn = db.conn()?;
    internships::delete(&mut conn, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Internship deleted successfully"
    })))
}

// ----- applications -----

#[get("/api/admin/applications")]
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

#[put("/api/admin/applications/{id}/status")]
pub async fn update_application_status(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<StatusRequest>,
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

// ----- students -----

#[get("/api/admin/students")]
pub async fn list_students(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let students = users::list_students(&conn)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "students": students })))
}

#[delete("/api/admin/students/{id}")]
pub async fn delete_student(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let mut conn = db.conn()?;
    users::delete_student(&mut conn, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Student deleted successfully"
    })))
}

// ----- dashboard -----

#[get("/api/admin/dashboard")]
pub async fn dashboard(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;

    let conn = db.conn()?;
    let stats = users::dashboard_stats(&conn)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "stats": stats })))
}

/// Legacy surface: sets company approval through a textual status. Other
/// roles have no status to update.
#[patch("/api/admin/users/{id}/status")]
pub async fn update_user_status(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<UserStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Admin)?;
    let id = path.into_inner();

    let approved = match body.status.as_str() {
        "approved" => true,
        "rejected" => false,
        other => {
            return Err(ApiError::Validation(format!("Invalid status: {}", other)));
        }
    };

    let conn = db.conn()?;
    let role: String = conn
        .query_row("SELECT role FROM users WHERE id = ?1", [id], |r| r.get(0))
        .map_err(|_| ApiError::NotFound("User not found".to_string()))?;
    if role.parse::<Role>()? != Role::Company {
        return Err(ApiError::Validation(
            "User type does not support status updates".to_string(),
        ));
    }

    users::set_company_approval(&conn, id, approved)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Company status updated successfully",
        "user_id": id,
        "status": body.status
    })))
}
