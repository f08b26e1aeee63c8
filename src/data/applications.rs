use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};

use crate::db;
use crate::enums::ApplicationStatus;
use crate::error::ApiError;

/// Company decision context for a status update: who is deciding, who is
/// told, and what (if anything) they are told.
pub struct DecisionNote<'a> {
    pub company_id: i64,
    pub student_id: i64,
    pub message: Option<&'a str>,
    pub contact_email: Option<&'a str>,
}

/// Submits an application. The posting must exist and the (student, posting)
/// pair must be new; the UNIQUE constraint backs up the pre-check, so a
/// racing duplicate still surfaces as a Conflict rather than a second row.
pub fn apply(conn: &Connection, student_id: i64, internship_id: i64, cover_letter: Option<&str>) -> Result<Value, ApiError> {
    let posting: Option<i64> = conn
        .query_row("SELECT id FROM internships WHERE id = ?1", [internship_id], |r| r.get(0))
        .optional()?;
    if posting.is_none() {
        return Err(ApiError::NotFound("Internship not found".to_string()));
    }

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM applications WHERE student_id = ?1 AND internship_id = ?2",
            params![student_id, internship_id],
            |r| r.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Already applied to this internship".to_string()));
    }

    let ts = db::now();
    conn.execute(
        "INSERT INTO applications (student_id, internship_id, status, cover_letter, applied_date, updated_at)
         VALUES (?1, ?2, 'Applied', ?3, ?4, ?4)",
        params![student_id, internship_id, cover_letter, ts],
    )
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict("Already applied to this internship".to_string()),
        other => other,
    })?;

    get(conn, conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> Result<Value, ApiError> {
    conn.query_row(
        "SELECT id, student_id, internship_id, status, cover_letter, applied_date, updated_at
         FROM applications WHERE id = ?1",
        [id],
        application_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))
}

fn application_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    Ok(json!({
        "id": row.get::<_, i64>(0)?,
        "student_id": row.get::<_, i64>(1)?,
        "internship_id": row.get::<_, i64>(2)?,
        "status": row.get::<_, String>(3)?,
        "cover_letter": row.get::<_, Option<String>>(4)?,
        "applied_date": row.get::<_, String>(5)?,
        "updated_at": row.get::<_, String>(6)?,
    }))
}

/// Returns the student id of the application, provided it was filed against
/// one of this company's postings. A missing application is NotFound; an
/// application owned by some other company is Forbidden.
pub fn student_for_company_application(conn: &Connection, application_id: i64, company_id: i64) -> Result<i64, ApiError> {
    let row: Option<(i64, i64)> = conn
        .query_row(
            "SELECT a.student_id, i.company_id
             FROM applications a
             JOIN internships i ON a.internship_id = i.id
             WHERE a.id = ?1",
            [application_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match row {
        None => Err(ApiError::NotFound("Application not found".to_string())),
        Some((_, owner)) if owner != company_id => Err(ApiError::Forbidden(
            "You can only update applications for your own internships".to_string(),
        )),
        Some((student_id, _)) => Ok(student_id),
    }
}

/// Moves an application to a new status. When the status is a terminal
/// company decision and the note carries non-empty text, the message row is
/// written in the same transaction as the status change; neither outlives a
/// failure of the other.
pub fn set_status(
    conn: &mut Connection,
    application_id: i64,
    status: ApplicationStatus,
    note: Option<DecisionNote<'_>>,
) -> Result<Value, ApiError> {
    let ts = db::now();
    let tx = conn.transaction()?;

    let changed = tx.execute(
        "UPDATE applications SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), ts, application_id],
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("Application not found".to_string()));
    }

    if let Some(note) = note {
        let text = note.message.map(str::trim).filter(|m| !m.is_empty());
        if let (Some(message_type), Some(text)) = (status.message_type(), text) {
            tx.execute(
                "INSERT INTO company_messages (application_id, company_id, student_id, message_type, message, contact_email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![application_id, note.company_id, note.student_id, message_type, text, note.contact_email, ts],
            )?;
        }
    }

    tx.commit()?;
    get(conn, application_id)
}

/// Student view, carrying the most recent company message for each
/// application when one exists.
pub fn for_student(conn: &Connection, student_id: i64) -> Result<Vec<Value>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.student_id, a.internship_id, a.status, a.cover_letter, a.applied_date, a.updated_at,
                i.title, cp.company_name, i.location, i.type,
                cm.id, cm.message_type, cm.message, cm.contact_email, cm.created_at
         FROM applications a
         JOIN internships i ON a.internship_id = i.id
         JOIN company_profiles cp ON i.company_id = cp.user_id
         LEFT JOIN company_messages cm ON cm.id = (
             SELECT id FROM company_messages
             WHERE application_id = a.id
             ORDER BY created_at DESC, id DESC
             LIMIT 1
         )
         WHERE a.student_id = ?1
         ORDER BY a.applied_date DESC",
    )?;
    let rows = stmt.query_map([student_id], |row| {
        let mut value = application_row(row)?;
        value["internship_title"] = json!(row.get::<_, String>(7)?);
        value["company_name"] = json!(row.get::<_, String>(8)?);
        value["location"] = json!(row.get::<_, Option<String>>(9)?);
        value["type"] = json!(row.get::<_, Option<String>>(10)?);
        value["message_id"] = json!(row.get::<_, Option<i64>>(11)?);
        value["message_type"] = json!(row.get::<_, Option<String>>(12)?);
        value["company_message"] = json!(row.get::<_, Option<String>>(13)?);
        value["company_contact_email"] = json!(row.get::<_, Option<String>>(14)?);
        value["message_date"] = json!(row.get::<_, Option<String>>(15)?);
        Ok(value)
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn for_company(conn: &Connection, company_id: i64) -> Result<Vec<Value>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.student_id, a.internship_id, a.status, a.cover_letter, a.applied_date, a.updated_at,
                sp.first_name, sp.last_name, u.email, i.title, i.company_id
         FROM applications a
         JOIN users u ON a.student_id = u.id
         JOIN student_profiles sp ON u.id = sp.user_id
         JOIN internships i ON a.internship_id = i.id
         WHERE i.company_id = ?1
         ORDER BY a.applied_date DESC",
    )?;
    let rows = stmt.query_map([company_id], |row| {
        let mut value = application_row(row)?;
        let first: String = row.get(7)?;
        let last: String = row.get(8)?;
        value["first_name"] = json!(first);
        value["last_name"] = json!(last);
        value["student_name"] = json!(format!("{} {}", first, last).trim());
        value["student_email"] = json!(row.get::<_, String>(9)?);
        value["internship_title"] = json!(row.get::<_, String>(10)?);
        value["company_id"] = json!(row.get::<_, i64>(11)?);
        Ok(value)
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn list_all_admin(conn: &Connection) -> Result<Vec<Value>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.student_id, a.internship_id, a.status, a.cover_letter, a.applied_date, a.updated_at,
                sp.first_name, sp.last_name, u_student.email, i.title, cp.company_name, u_company.email
         FROM applications a
         JOIN users u_student ON a.student_id = u_student.id
         JOIN student_profiles sp ON u_student.id = sp.user_id
         JOIN internships i ON a.internship_id = i.id
         JOIN company_profiles cp ON i.company_id = cp.user_id
         JOIN users u_company ON i.company_id = u_company.id
         ORDER BY a.applied_date DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        let mut value = application_row(row)?;
        let first: String = row.get(7)?;
        let last: String = row.get(8)?;
        value["student_name"] = json!(format!("{} {}", first, last).trim());
        value["student_email"] = json!(row.get::<_, String>(9)?);
        value["internship_title"] = json!(row.get::<_, String>(10)?);
        value["company_name"] = json!(row.get::<_, String>(11)?);
        value["company_email"] = json!(row.get::<_, String>(12)?);
        Ok(value)
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Conditional counts over the whole table, computed at query time.
pub fn stats_admin(conn: &Connection) -> Result<Value, ApiError> {
    conn.query_row(
        "SELECT COUNT(*),
                COUNT(CASE WHEN status = 'Applied' THEN 1 END),
                COUNT(CASE WHEN status = 'Hired' THEN 1 END),
                COUNT(CASE WHEN status = 'Rejected' THEN 1 END),
                COUNT(CASE WHEN status = 'Withdrawn' THEN 1 END)
         FROM applications",
        [],
        |row| {
            Ok(json!({
                "total_applications": row.get::<_, i64>(0)?,
                "pending": row.get::<_, i64>(1)?,
                "accepted": row.get::<_, i64>(2)?,
                "rejected": row.get::<_, i64>(3)?,
                "withdrawn": row.get::<_, i64>(4)?,
            }))
        },
    )
    .map_err(ApiError::from)
}

pub fn stats_company(conn: &Connection, company_id: i64) -> Result<Value, ApiError> {
    conn.query_row(
        "SELECT COUNT(*),
                COUNT(CASE WHEN a.status = 'Applied' THEN 1 END),
                COUNT(CASE WHEN a.status = 'Hired' THEN 1 END),
                COUNT(CASE WHEN a.status = 'Rejected' THEN 1 END)
         FROM applications a
         JOIN internships i ON a.internship_id = i.id
         WHERE i.company_id = ?1",
        [company_id],
        |row| {
            Ok(json!({
                "total_applications": row.get::<_, i64>(0)?,
                "pending_applications": row.get::<_, i64>(1)?,
                "accepted_applications": row.get::<_, i64>(2)?,
                "rejected_applications": row.get::<_, i64>(3)?,
            }))
        },
    )
    .map_err(ApiError::from)
}

/// Every message ever sent to this student, newest first.
pub fn messages_for_student(conn: &Connection, student_id: i64) -> Result<Vec<Value>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT cm.id, cm.application_id, cm.message_type, cm.message, cm.contact_email, cm.created_at,
                i.title, cp.company_name, a.status
         FROM company_messages cm
         JOIN applications a ON cm.application_id = a.id
         JOIN internships i ON a.internship_id = i.id
         JOIN company_profiles cp ON i.company_id = cp.user_id
         WHERE cm.student_id = ?1
         ORDER BY cm.created_at DESC",
    )?;
    let rows = stmt.query_map([student_id], |row| {
        Ok(json!({
            "id": row.get::<_, i64>(0)?,
            "application_id": row.get::<_, i64>(1)?,
            "message_type": row.get::<_, String>(2)?,
            "message": row.get::<_, String>(3)?,
            "contact_email": row.get::<_, Option<String>>(4)?,
            "created_at": row.get::<_, String>(5)?,
            "internship_title": row.get::<_, String>(6)?,
            "company_name": row.get::<_, String>(7)?,
            "application_status": row.get::<_, String>(8)?,
        }))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
