use actix_web::{delete, get, post, put, web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::Deserialize;
use serde_json::json;

use crate::applications;
use crate::config::Config;
use crate::db::Database;
use crate::enums::Role;
use crate::error::ApiError;
use crate::internships;
use crate::token;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub cover_letter: Option<String>,
}

#[get("/api/internships")]
pub async fn list_internships(db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let conn = db.conn()?;
    let internships = internships::list_public(&conn)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "internships": internships })))
}

#[get("/api/internships/search")]
pub async fn search_internships(
    db: web::Data<Database>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.conn()?;
    let internships = internships::search_public(
        &conn,
        query.q.as_deref(),
        query.location.as_deref(),
        query.company.as_deref(),
    )?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "internships": internships })))
}

#[get("/api/internships/company/my-internships")]
pub async fn my_internships(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Company)?;

    let conn = db.conn()?;
    let internships = internships::list_for_company(&conn, claims.id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "internships": internships })))
}

#[get("/api/internships/{id}")]
pub async fn get_internship(db: web::Data<Database>, path: web::Path<i64>) -> Result<HttpResponse, ApiError> {
    let conn = db.conn()?;
    let internship = internships::get_public(&conn, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "internship": internship })))
}

#[post("/api/internships")]
pub async fn create_internship(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    body: web::Json<internships::InternshipPayload>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Company)?;
    if body.title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }

    let conn = db.conn()?;
    let internship = internships::create(&conn, claims.id, &body, false)?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Internship created successfully and pending admin approval",
        "internship": internship
    })))
}

#[put("/api/internships/{id}")]
pub async fn update_internship(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<internships::InternshipPayload>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Company)?;
    let id = path.into_inner();

    let conn = db.conn()?;
    internships::ensure_owner(&conn, id, claims.id)?;
    let internship = internships::company_update(&conn, id, &body)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Internship updated successfully and pending admin approval",
        "internship": internship
    })))
}

#[delete("/api/internships/{id}")]
pub async fn delete_internship(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Company)?;
    let id = path.into_inner();

    let mut conn = db.conn()?;
    internships::ensure_owner(&conn, id, claims.id)?;
    internships::delete(&mut conn, id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Internship deleted successfully"
    })))
}

#[post("/api/internships/{id}/apply")]
pub async fn apply_to_internship(
    db: web::Data<Database>,
    config: web::Data<Config>,
    auth: BearerAuth,
    path: web::Path<i64>,
    body: web::Json<ApplyRequest>,
) -> Result<HttpResponse, ApiError> {
    let claims = token::verify(auth.token(), &config.jwt_secret)?;
    claims.require_role(Role::Student)?;

    let conn = db.conn()?;
    let application = applications::apply(&conn, claims.id, path.into_inner(), body.cover_letter.as_deref())?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Application submitted successfully",
        "application": application
    })))
}
