use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct Internship {
    pub id: i64,
    pub company_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub internship_type: Option<String>,
    pub duration: Option<String>,
    pub stipend: Option<String>,
    pub deadline: Option<String>,
    pub is_active: bool,
    pub is_approved: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct InternshipPayload {
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub internship_type: Option<String>,
    pub duration: Option<String>,
    pub stipend: Option<String>,
    pub deadline: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

const COLUMNS: &str = "id, company_id, title, description, requirements, responsibilities, \
                       location, type, duration, stipend, deadline, is_active, is_approved, \
                       created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Internship> {
    Ok(Internship {
        id: row.get(0)?,
        company_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        requirements: row.get(4)?,
        responsibilities: row.get(5)?,
        location: row.get(6)?,
        internship_type: row.get(7)?,
        duration: row.get(8)?,
        stipend: row.get(9)?,
        deadline: row.get(10)?,
        is_active: row.get(11)?,
        is_approved: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub fn get(conn: &Connection, id: i64) -> Result<Internship, ApiError> {
    conn.query_row(
        &format!("SELECT {} FROM internships WHERE id = ?1", COLUMNS),
        [id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Internship not found".to_string()))
}

/// Admin-created postings start approved; company-created ones wait for
/// review.
pub fn create(conn: &Connection, company_id: i64, req: &InternshipPayload, approved: bool) -> Result<Internship, ApiError> {
    let ts = db::now();
    conn.execute(
        "INSERT INTO internships (company_id, title, description, requirements, responsibilities,
                                  location, type, duration, stipend, deadline, is_active, is_approved,
                                  created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
        params![
            company_id,
            req.title,
            req.description,
            req.requirements.as_deref().unwrap_or(""),
            req.responsibilities.as_deref().unwrap_or(""),
            req.location,
            req.internship_type,
            req.duration.as_deref().unwrap_or(""),
            req.stipend.as_deref().unwrap_or(""),
            req.deadline,
            req.is_active,
            approved,
            ts
        ],
    )?;
    get(conn, conn.last_insert_rowid())
}

pub fn ensure_owner(conn: &Connection, id: i64, company_id: i64) -> Result<(), ApiError> {
    let owned: Option<i64> = conn
        .query_row(
            "SELECT id FROM internships WHERE id = ?1 AND company_id = ?2",
            params![id, company_id],
            |r| r.get(0),
        )
        .optional()?;
    if owned.is_none() {
        return Err(ApiError::Forbidden("You can only manage your own internships".to_string()));
    }
    Ok(())
}

/// Company edit: any change sends the posting back to review. The active
/// flag stays whatever the owner submitted; approval is not theirs to keep.
pub fn company_update(conn: &Connection, id: i64, req: &InternshipPayload) -> Result<Internship, ApiError> {
    let changed = conn.execute(
        "UPDATE internships SET
            title = ?1, description = ?2, requirements = ?3, responsibilities = ?4, location = ?5,
            type = ?6, duration = ?7, stipend = ?8, deadline = ?9, is_active = ?10,
            is_approved = 0, updated_at = ?11
         WHERE id = ?12",
        params![
            req.title,
            req.description,
            req.requirements.as_deref().unwrap_or(""),
            req.responsibilities.as_deref().unwrap_or(""),
            req.location,
            req.internship_type,
            req.duration.as_deref().unwrap_or(""),
            req.stipend.as_deref().unwrap_or(""),
            req.deadline,
            req.is_active,
            db::now(),
            id
        ],
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("Internship not found".to_string()));
    }
    get(conn, id)
}

/// Admin edit does not disturb the approval flag.
pub fn admin_update(conn: &Connection, id: i64, req: &InternshipPayload) -> Result<Internship, ApiError> {
    let changed = conn.execute(
        "UPDATE internships SET
            title = ?1, description = ?2, requirements = ?3, responsibilities = ?4, location = ?5,
            type = ?6, duration = ?7, stipend = ?8, deadline = ?9, is_active = ?10, updated_at = ?11
         WHERE id = ?12",
        params![
            req.title,
            req.description,
            req.requirements.as_deref().unwrap_or(""),
            req.responsibilities.as_deref().unwrap_or(""),
            req.location,
            req.internship_type,
            req.duration.as_deref().unwrap_or(""),
            req.stipend.as_deref().unwrap_or(""),
            req.deadline,
            req.is_active,
            db::now(),
            id
        ],
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("Internship not found".to_string()));
    }
    get(conn, id)
}

pub fn set_approval(conn: &Connection, id: i64, approved: bool) -> Result<Internship, ApiError> {
    let changed = conn.execute(
        "UPDATE internships SET is_approved = ?1, updated_at = ?2 WHERE id = ?3",
        params![approved, db::now(), id],
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("Internship not found".to_string()));
    }
    get(conn, id)
}

/// Removes the posting and everything hanging off it in one transaction.
pub fn delete(conn: &mut Connection, id: i64) -> Result<(), ApiError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM applications WHERE internship_id = ?1", [id])?;
    let deleted = tx.execute("DELETE FROM internships WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Internship not found".to_string()));
    }
    tx.commit()?;
    Ok(())
}

pub fn list_for_company(conn: &Connection, company_id: i64) -> Result<Vec<Internship>, ApiError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM internships WHERE company_id = ?1 ORDER BY created_at DESC",
        COLUMNS
    ))?;
    let rows = stmt.query_map([company_id], from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn public_row(row: &Row<'_>) -> rusqlite::Result<Value> {
    let internship = from_row(row)?;
    let mut value = serde_json::to_value(internship).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    value["company_name"] = json!(row.get::<_, String>(15)?);
    value["industry"] = json!(row.get::<_, Option<String>>(16)?);
    Ok(value)
}

/// Public listing: a posting shows up only when the owner wants it live,
/// an admin has approved it, and its company is itself approved.
pub fn list_public(conn: &Connection) -> Result<Vec<Value>, ApiError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, cp.company_name, cp.industry
         FROM internships i
         JOIN company_profiles cp ON i.company_id = cp.user_id
         WHERE i.is_active = 1 AND i.is_approved = 1 AND cp.is_approved = 1
         ORDER BY i.created_at DESC",
        qualified_columns()
    ))?;
    let rows = stmt.query_map([], public_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Case-insensitive substring filters, AND-combined, over the same
/// visibility set as the listing.
pub fn search_public(
    conn: &Connection,
    q: Option<&str>,
    location: Option<&str>,
    company: Option<&str>,
) -> Result<Vec<Value>, ApiError> {
    let mut sql = format!(
        "SELECT {}, cp.company_name, cp.industry
         FROM internships i
         JOIN company_profiles cp ON i.company_id = cp.user_id
         WHERE i.is_active = 1 AND i.is_approved = 1 AND cp.is_approved = 1",
        qualified_columns()
    );
    let mut filters: Vec<String> = Vec::new();

    if let Some(q) = q.filter(|s| !s.trim().is_empty()) {
        filters.push(format!("%{}%", q.to_lowercase()));
        let n = filters.len();
        sql.push_str(&format!(
            " AND (LOWER(i.title) LIKE ?{n} OR LOWER(i.description) LIKE ?{n})",
            n = n
        ));
    }
    if let Some(location) = location.filter(|s| !s.trim().is_empty()) {
        filters.push(format!("%{}%", location.to_lowercase()));
        sql.push_str(&format!(" AND LOWER(i.location) LIKE ?{}", filters.len()));
    }
    if let Some(company) = company.filter(|s| !s.trim().is_empty()) {
        filters.push(format!("%{}%", company.to_lowercase()));
        sql.push_str(&format!(" AND LOWER(cp.company_name) LIKE ?{}", filters.len()));
    }
    sql.push_str(" ORDER BY i.created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filters), public_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn get_public(conn: &Connection, id: i64) -> Result<Value, ApiError> {
    conn.query_row(
        &format!(
            "SELECT {}, cp.company_name, cp.industry
             FROM internships i
             JOIN company_profiles cp ON i.company_id = cp.user_id
             WHERE i.id = ?1 AND i.is_active = 1 AND i.is_approved = 1 AND cp.is_approved = 1",
            qualified_columns()
        ),
        [id],
        public_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Internship not found".to_string()))
}

pub fn list_all_admin(conn: &Connection) -> Result<Vec<Value>, ApiError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, cp.company_name, u.email
         FROM internships i
         JOIN company_profiles cp ON i.company_id = cp.user_id
         JOIN users u ON i.company_id = u.id
         ORDER BY i.created_at DESC",
        qualified_columns()
    ))?;
    let rows = stmt.query_map([], |row| {
        let internship = from_row(row)?;
        let mut value = serde_json::to_value(internship).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        value["company_name"] = json!(row.get::<_, String>(15)?);
        value["company_email"] = json!(row.get::<_, String>(16)?);
        Ok(value)
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn qualified_columns() -> String {
    COLUMNS
        .split(", ")
        .map(|c| format!("i.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::users;
    use crate::users::tests::{company_request, student_request};

    fn payload(title: &str) -> InternshipPayload {
        InternshipPayload {
            title: title.to_string(),
            description: Some("Work on difference engines".to_string()),
            requirements: None,
            responsibilities: None,
            location: Some("London".to_string()),
            internship_type: Some("Full-time".to_string()),
            duration: Some("3 months".to_string()),
            stipend: None,
            deadline: None,
            is_active: true,
        }
    }

    #[test]
    fn listing_requires_all_three_flags() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();

        // One company per combination so the company flag varies
        // independently of the posting flags.
        for (i, (active, approved, company_approved)) in [
            (false, false, false),
            (false, false, true),
            (false, true, false),
            (false, true, true),
            (true, false, false),
            (true, false, true),
            (true, true, false),
            (true, true, true),
        ]
        .iter()
        .enumerate()
        {
            let email = format!("company{}@example.com", i);
            let company = users::register_company(&mut conn, &company_request(&email), "hash").unwrap();
            users::set_company_approval(&conn, company, *company_approved).unwrap();

            let mut req = payload(&format!("combo-{}", i));
            req.is_active = *active;
            create(&conn, company, &req, *approved).unwrap();
        }

        let listed = list_public(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["title"], "combo-7");
    }

    #[test]
    fn company_edit_resets_approval_but_not_active() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();
        let company = users::register_company(&mut conn, &company_request("co@example.com"), "hash").unwrap();
        let posting = create(&conn, company, &payload("Engine Intern"), false).unwrap();
        set_approval(&conn, posting.id, true).unwrap();

        let updated = company_update(&conn, posting.id, &payload("Engine Intern v2")).unwrap();
        assert!(!updated.is_approved);
        assert!(updated.is_active);
        assert_eq!(updated.title, "Engine Intern v2");
    }

    #[test]
    fn admin_edit_keeps_approval() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();
        let company = users::register_company(&mut conn, &company_request("co@example.com"), "hash").unwrap();
        let posting = create(&conn, company, &payload("Engine Intern"), true).unwrap();

        let updated = admin_update(&conn, posting.id, &payload("Engine Intern v2")).unwrap();
        assert!(updated.is_approved);
    }

    #[test]
    fn search_is_case_insensitive_and_and_combined() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();
        let company = users::register_company(&mut conn, &company_request("co@example.com"), "hash").unwrap();
        users::set_company_approval(&conn, company, true).unwrap();

        let mut berlin = payload("Data Engineering Intern");
        berlin.location = Some("Berlin".to_string());
        create(&conn, company, &berlin, true).unwrap();
        create(&conn, company, &payload("Mechanical Intern"), true).unwrap();

        let hits = search_public(&conn, Some("DATA"), Some("berlin"), None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["title"], "Data Engineering Intern");

        // Same query but the location filter no longer matches: AND semantics.
        let hits = search_public(&conn, Some("DATA"), Some("london"), None).unwrap();
        assert!(hits.is_empty());

        // Company-name filter joins through the profile.
        let hits = search_public(&conn, None, None, Some("babbage")).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn search_does_not_leak_unapproved_postings() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();
        let company = users::register_company(&mut conn, &company_request("co@example.com"), "hash").unwrap();
        users::set_company_approval(&conn, company, true).unwrap();
        create(&conn, company, &payload("Hidden Intern"), false).unwrap();

        assert!(search_public(&conn, Some("hidden"), None, None).unwrap().is_empty());
    }

    #[test]
    fn public_detail_hides_invisible_postings() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();
        let company = users::register_company(&mut conn, &company_request("co@example.com"), "hash").unwrap();
        let posting = create(&conn, company, &payload("Engine Intern"), true).unwrap();

        // Posting approved but company still pending.
        assert!(matches!(get_public(&conn, posting.id), Err(ApiError::NotFound(_))));

        users::set_company_approval(&conn, company, true).unwrap();
        let detail = get_public(&conn, posting.id).unwrap();
        assert_eq!(detail["company_name"], "Babbage Engines");
    }

    #[test]
    fn ownership_guard_rejects_other_companies() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();
        let owner = users::register_company(&mut conn, &company_request("a@example.com"), "hash").unwrap();
        let other = users::register_company(&mut conn, &company_request("b@example.com"), "hash").unwrap();
        let posting = create(&conn, owner, &payload("Engine Intern"), false).unwrap();

        assert!(ensure_owner(&conn, posting.id, owner).is_ok());
        assert!(matches!(ensure_owner(&conn, posting.id, other), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn delete_takes_applications_with_it() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();
        let company = users::register_company(&mut conn, &company_request("co@example.com"), "hash").unwrap();
        let student = users::register_student(&mut conn, &student_request("s@example.com"), "hash").unwrap();
        let posting = create(&conn, company, &payload("Engine Intern"), true).unwrap();
        conn.execute(
            "INSERT INTO applications (student_id, internship_id, applied_date, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![student, posting.id, db::now()],
        )
        .unwrap();

        delete(&mut conn, posting.id).unwrap();

        let apps: i64 = conn.query_row("SELECT COUNT(*) FROM applications", [], |r| r.get(0)).unwrap();
        assert_eq!(apps, 0);
        assert!(matches!(get(&conn, posting.id), Err(ApiError::NotFound(_))));
    }
}
