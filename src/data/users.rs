use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db;
use crate::enums::Role;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StudentRegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub university: Option<String>,
    pub major: Option<String>,
    pub graduation_year: Option<i64>,
    pub phone: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompanyRegisterRequest {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: String,
    pub password: String,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudentProfileUpdate {
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub major: Option<String>,
    pub university: Option<String>,
    pub graduation_year: Option<i64>,
    pub phone: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub gpa: Option<f64>,
    pub education: Option<String>,
    pub date_of_birth: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub portfolio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompanyProfileUpdate {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    /// Admin-only: moves the login email along with the profile.
    pub contact_email: Option<String>,
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, ApiError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users WHERE email = ?1", [email], |r| r.get(0))?;
    Ok(count > 0)
}

/// Credential lookup for login: id, stored hash, role.
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<(i64, String, Role)>, ApiError> {
    let row = conn
        .query_row(
            "SELECT id, password_hash, role FROM users WHERE email = ?1",
            [email],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?)),
        )
        .optional()?;
    match row {
        Some((id, hash, role)) => Ok(Some((id, hash, role.parse()?))),
        None => Ok(None),
    }
}

/// Creates the account and its student profile as one atomic unit: both
/// rows exist afterwards or neither does.
pub fn register_student(conn: &mut Connection, req: &StudentRegisterRequest, password_hash: &str) -> Result<i64, ApiError> {
    let ts = db::now();
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users (email, password_hash, role, created_at, updated_at) VALUES (?1, ?2, 'student', ?3, ?3)",
        params![req.email, password_hash, ts],
    )?;
    let user_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO student_profiles (user_id, first_name, last_name, university, major, graduation_year, phone, skills, experience, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            user_id,
            req.first_name,
            req.last_name,
            req.university,
            req.major,
            req.graduation_year,
            req.phone,
            req.skills.as_deref().unwrap_or(""),
            req.experience.as_deref().unwrap_or(""),
            ts
        ],
    )?;
    tx.commit()?;
    Ok(user_id)
}

/// Same atomic shape as student registration; the company profile starts
/// unapproved and stays invisible to the public side until an admin acts.
pub fn register_company(conn: &mut Connection, req: &CompanyRegisterRequest, password_hash: &str) -> Result<i64, ApiError> {
    let ts = db::now();
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users (email, password_hash, role, created_at, updated_at) VALUES (?1, ?2, 'company', ?3, ?3)",
        params![req.email, password_hash, ts],
    )?;
    let user_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO company_profiles (user_id, company_name, contact_person, industry, location, website, description, phone, is_approved, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)",
        params![
            user_id,
            req.company_name,
            req.contact_person,
            req.industry.as_deref().unwrap_or(""),
            req.location.as_deref().unwrap_or(""),
            req.website.as_deref().unwrap_or(""),
            req.description.as_deref().unwrap_or(""),
            req.phone,
            ts
        ],
    )?;
    tx.commit()?;
    Ok(user_id)
}

pub fn company_is_approved(conn: &Connection, user_id: i64) -> Result<bool, ApiError> {
    let approved: Option<bool> = conn
        .query_row(
            "SELECT is_approved FROM company_profiles WHERE user_id = ?1",
            [user_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(approved.unwrap_or(false))
}

pub fn student_info(conn: &Connection, user_id: i64) -> Result<Value, ApiError> {
    conn.query_row(
        "SELECT u.id, u.email, u.role, sp.first_name, sp.last_name, sp.major, sp.university,
                sp.graduation_year, sp.phone, sp.skills, sp.experience
         FROM users u JOIN student_profiles sp ON u.id = sp.user_id
         WHERE u.id = ?1",
        [user_id],
        |row| {
            let first: String = row.get(3)?;
            let last: String = row.get(4)?;
            let name = format!("{} {}", first, last).trim().to_string();
            Ok(json!({
                "id": row.get::<_, i64>(0)?,
                "email": row.get::<_, String>(1)?,
                "role": row.get::<_, String>(2)?,
                "name": name,
                "first_name": first,
                "last_name": last,
                "major": row.get::<_, Option<String>>(5)?,
                "university": row.get::<_, Option<String>>(6)?,
                "graduation_year": row.get::<_, Option<i64>>(7)?,
                "phone": row.get::<_, Option<String>>(8)?,
                "skills": row.get::<_, Option<String>>(9)?,
                "experience": row.get::<_, Option<String>>(10)?,
            }))
        },
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Student profile not found".to_string()))
}

/// Extended self-view: everything `student_info` has plus the optional
/// fields a student can fill in later.
pub fn student_profile_full(conn: &Connection, user_id: i64) -> Result<Value, ApiError> {
    conn.query_row(
        "SELECT u.id, u.email, u.role, sp.first_name, sp.last_name, sp.major, sp.university,
                sp.graduation_year, sp.phone, sp.skills, sp.experience, sp.location, sp.bio,
                sp.gpa, sp.education, sp.date_of_birth, sp.linkedin_url, sp.github_url,
                sp.portfolio_url, sp.resume_url, sp.created_at
         FROM users u JOIN student_profiles sp ON u.id = sp.user_id
         WHERE u.id = ?1",
        [user_id],
        |row| {
            let first: String = row.get(3)?;
            let last: String = row.get(4)?;
            let name = format!("{} {}", first, last).trim().to_string();
            Ok(json!({
                "id": row.get::<_, i64>(0)?,
                "email": row.get::<_, String>(1)?,
                "role": row.get::<_, String>(2)?,
                "name": name,
                "first_name": first,
                "last_name": last,
                "major": row.get::<_, Option<String>>(5)?,
                "university": row.get::<_, Option<String>>(6)?,
                "graduation_year": row.get::<_, Option<i64>>(7)?,
                "phone": row.get::<_, Option<String>>(8)?,
                "skills": row.get::<_, Option<String>>(9)?,
                "experience": row.get::<_, Option<String>>(10)?,
                "location": row.get::<_, Option<String>>(11)?,
                "bio": row.get::<_, Option<String>>(12)?,
                "gpa": row.get::<_, Option<f64>>(13)?,
                "education": row.get::<_, Option<String>>(14)?,
                "date_of_birth": row.get::<_, Option<String>>(15)?,
                "linkedin_url": row.get::<_, Option<String>>(16)?,
                "github_url": row.get::<_, Option<String>>(17)?,
                "portfolio_url": row.get::<_, Option<String>>(18)?,
                "resume_url": row.get::<_, Option<String>>(19)?,
                "created_at": row.get::<_, String>(20)?,
            }))
        },
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Student profile not found".to_string()))
}

pub fn company_info(conn: &Connection, user_id: i64) -> Result<Value, ApiError> {
    conn.query_row(
        "SELECT u.id, u.email, u.role, cp.company_name, cp.contact_person, cp.industry,
                cp.location, cp.website, cp.description, cp.phone, cp.is_approved
         FROM users u JOIN company_profiles cp ON u.id = cp.user_id
         WHERE u.id = ?1",
        [user_id],
        |row| {
            Ok(json!({
                "id": row.get::<_, i64>(0)?,
                "email": row.get::<_, String>(1)?,
                "role": row.get::<_, String>(2)?,
                "company_name": row.get::<_, String>(3)?,
                "contact_person": row.get::<_, Option<String>>(4)?,
                "industry": row.get::<_, Option<String>>(5)?,
                "location": row.get::<_, Option<String>>(6)?,
                "website": row.get::<_, Option<String>>(7)?,
                "description": row.get::<_, Option<String>>(8)?,
                "phone": row.get::<_, Option<String>>(9)?,
                "is_approved": row.get::<_, bool>(10)?,
            }))
        },
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Company not found".to_string()))
}

pub fn admin_info(conn: &Connection, user_id: i64) -> Result<Value, ApiError> {
    conn.query_row(
        "SELECT id, email, role FROM users WHERE id = ?1 AND role = 'admin'",
        [user_id],
        |row| {
            Ok(json!({
                "id": row.get::<_, i64>(0)?,
                "email": row.get::<_, String>(1)?,
                "role": row.get::<_, String>(2)?,
                "name": "Administrator",
            }))
        },
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Admin not found".to_string()))
}

fn split_name(name: &str) -> (String, String) {
    let mut parts = name.trim().split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

pub fn update_student_profile(conn: &Connection, user_id: i64, req: &StudentProfileUpdate) -> Result<Value, ApiError> {
    let (first, last) = match (&req.first_name, &req.last_name, &req.name) {
        (None, None, Some(name)) => split_name(name),
        (f, l, _) => (f.clone().unwrap_or_default(), l.clone().unwrap_or_default()),
    };

    let changed = conn.execute(
        "UPDATE student_profiles SET
            first_name = ?1, last_name = ?2, major = ?3, university = ?4, graduation_year = ?5,
            phone = ?6, skills = ?7, experience = ?8, location = ?9, bio = ?10, gpa = ?11,
            education = ?12, date_of_birth = ?13, linkedin_url = ?14, github_url = ?15,
            portfolio_url = ?16, updated_at = ?17
         WHERE user_id = ?18",
        params![
            first,
            last,
            req.major,
            req.university,
            req.graduation_year,
            req.phone,
            req.skills.as_deref().unwrap_or(""),
            req.experience.as_deref().unwrap_or(""),
            req.location.as_deref().unwrap_or(""),
            req.bio.as_deref().unwrap_or(""),
            req.gpa,
            req.education.as_deref().unwrap_or(""),
            req.date_of_birth,
            req.linkedin_url.as_deref().unwrap_or(""),
            req.github_url.as_deref().unwrap_or(""),
            req.portfolio_url.as_deref().unwrap_or(""),
            db::now(),
            user_id
        ],
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("Student profile not found".to_string()));
    }
    student_profile_full(conn, user_id)
}

pub fn update_company_profile(conn: &Connection, user_id: i64, req: &CompanyProfileUpdate) -> Result<Value, ApiError> {
    let changed = conn.execute(
        "UPDATE company_profiles SET
            company_name = ?1, contact_person = ?2, industry = ?3, location = ?4,
            website = ?5, description = ?6, phone = ?7, updated_at = ?8
         WHERE user_id = ?9",
        params![
            req.company_name,
            req.contact_person,
            req.industry,
            req.location,
            req.website,
            req.description,
            req.phone,
            db::now(),
            user_id
        ],
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("Company profile not found".to_string()));
    }
    company_info(conn, user_id)
}

/// Admin edit: profile fields plus, optionally, the account email — both
/// inside one transaction so a bad email update cannot leave a half-renamed
/// company behind.
pub fn admin_update_company(conn: &mut Connection, user_id: i64, req: &CompanyProfileUpdate) -> Result<(), ApiError> {
    let ts = db::now();
    let tx = conn.transaction()?;
    let changed = tx.execute(
        "UPDATE company_profiles SET
            company_name = ?1, contact_person = ?2, industry = ?3, location = ?4,
            website = ?5, description = ?6, phone = ?7, updated_at = ?8
         WHERE user_id = ?9",
        params![
            req.company_name,
            req.contact_person,
            req.industry,
            req.location,
            req.website,
            req.description,
            req.phone,
            ts,
            user_id
        ],
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("Company not found".to_string()));
    }
    if let Some(email) = &req.contact_email {
        tx.execute(
            "UPDATE users SET email = ?1, updated_at = ?2 WHERE id = ?3",
            params![email, ts, user_id],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn current_password_hash(conn: &Connection, user_id: i64, role: Role) -> Result<String, ApiError> {
    conn.query_row(
        "SELECT password_hash FROM users WHERE id = ?1 AND role = ?2",
        params![user_id, role.as_str()],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub fn set_password(conn: &Connection, user_id: i64, password_hash: &str) -> Result<(), ApiError> {
    conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        params![password_hash, db::now(), user_id],
    )?;
    Ok(())
}

pub fn list_companies(conn: &Connection) -> Result<Vec<Value>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.email, u.created_at, cp.company_name, cp.contact_person, cp.industry,
                cp.location, cp.website, cp.description, cp.phone, cp.is_approved
         FROM users u JOIN company_profiles cp ON u.id = cp.user_id
         WHERE u.role = 'company'
         ORDER BY cp.company_name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(json!({
            "id": row.get::<_, i64>(0)?,
            "email": row.get::<_, String>(1)?,
            "created_at": row.get::<_, String>(2)?,
            "company_name": row.get::<_, String>(3)?,
            "contact_person": row.get::<_, Option<String>>(4)?,
            "industry": row.get::<_, Option<String>>(5)?,
            "location": row.get::<_, Option<String>>(6)?,
            "website": row.get::<_, Option<String>>(7)?,
            "description": row.get::<_, Option<String>>(8)?,
            "phone": row.get::<_, Option<String>>(9)?,
            "is_approved": row.get::<_, bool>(10)?,
        }))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Idempotent: re-setting the current flag value is an accepted no-op.
pub fn set_company_approval(conn: &Connection, user_id: i64, approved: bool) -> Result<Value, ApiError> {
    let changed = conn.execute(
        "UPDATE company_profiles SET is_approved = ?1, updated_at = ?2 WHERE user_id = ?3",
        params![approved, db::now(), user_id],
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("Company not found".to_string()));
    }
    company_info(conn, user_id)
}

pub fn delete_company(conn: &mut Connection, user_id: i64) -> Result<(), ApiError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM company_profiles WHERE user_id = ?1", [user_id])?;
    let deleted = tx.execute("DELETE FROM users WHERE id = ?1 AND role = 'company'", [user_id])?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Company not found".to_string()));
    }
    tx.commit()?;
    Ok(())
}

pub fn list_students(conn: &Connection) -> Result<Vec<Value>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.email, u.created_at, sp.first_name, sp.last_name, sp.major,
                sp.university, sp.graduation_year, sp.phone, sp.skills, sp.experience
         FROM users u JOIN student_profiles sp ON u.id = sp.user_id
         WHERE u.role = 'student'
         ORDER BY sp.first_name, sp.last_name",
    )?;
    let rows = stmt.query_map([], |row| {
        let first: String = row.get(3)?;
        let last: String = row.get(4)?;
        let name = format!("{} {}", first, last).trim().to_string();
        Ok(json!({
            "id": row.get::<_, i64>(0)?,
            "email": row.get::<_, String>(1)?,
            "created_at": row.get::<_, String>(2)?,
            "name": name,
            "first_name": first,
            "last_name": last,
            "major": row.get::<_, Option<String>>(5)?,
            "university": row.get::<_, Option<String>>(6)?,
            "graduation_year": row.get::<_, Option<i64>>(7)?,
            "phone": row.get::<_, Option<String>>(8)?,
            "skills": row.get::<_, Option<String>>(9)?,
            "experience": row.get::<_, Option<String>>(10)?,
        }))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn delete_student(conn: &mut Connection, user_id: i64) -> Result<(), ApiError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM student_profiles WHERE user_id = ?1", [user_id])?;
    let deleted = tx.execute("DELETE FROM users WHERE id = ?1 AND role = 'student'", [user_id])?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }
    tx.commit()?;
    Ok(())
}

/// Startup bootstrap: admins have no registration endpoint, so the first
/// one is seeded from the environment. Returns false when the email is
/// already taken.
pub fn ensure_admin(conn: &Connection, email: &str, password_hash: &str) -> Result<bool, ApiError> {
    if email_exists(conn, email)? {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO users (email, password_hash, role, created_at, updated_at) VALUES (?1, ?2, 'admin', ?3, ?3)",
        params![email, password_hash, db::now()],
    )?;
    Ok(true)
}

/// Dashboard counts are computed from current table contents on every call,
/// so they always match the literal row counts.
pub fn dashboard_stats(conn: &Connection) -> Result<Value, ApiError> {
    let students: i64 = conn.query_row("SELECT COUNT(*) FROM users WHERE role = 'student'", [], |r| r.get(0))?;
    let companies: i64 = conn.query_row("SELECT COUNT(*) FROM users WHERE role = 'company'", [], |r| r.get(0))?;
    let internships: i64 = conn.query_row("SELECT COUNT(*) FROM internships", [], |r| r.get(0))?;
    let applications: i64 = conn.query_row("SELECT COUNT(*) FROM applications", [], |r| r.get(0))?;
    Ok(json!({
        "total_students": students,
        "total_companies": companies,
        "total_internships": internships,
        "total_applications": applications,
    }))
}
