use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

use crate::error::ApiError;

/// Schema bootstrap, executed on every startup. `IF NOT EXISTS` keeps it
/// idempotent across restarts.
///
/// The UNIQUE(student_id, internship_id) pair turns a concurrent duplicate
/// apply into a constraint failure instead of a second row.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('student', 'company', 'admin')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    university TEXT,
    major TEXT,
    graduation_year INTEGER,
    phone TEXT,
    skills TEXT,
    experience TEXT,
    location TEXT,
    bio TEXT,
    gpa REAL,
    education TEXT,
    date_of_birth TEXT,
    linkedin_url TEXT,
    github_url TEXT,
    portfolio_url TEXT,
    resume_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS company_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    company_name TEXT NOT NULL,
    contact_person TEXT,
    industry TEXT,
    location TEXT,
    website TEXT,
    description TEXT,
    phone TEXT,
    is_approved INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS internships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT,
    requirements TEXT,
    responsibilities TEXT,
    location TEXT,
    type TEXT,
    duration TEXT,
    stipend TEXT,
    deadline TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_approved INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    internship_id INTEGER NOT NULL REFERENCES internships(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'Applied',
    cover_letter TEXT,
    applied_date TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (student_id, internship_id)
);

CREATE TABLE IF NOT EXISTS company_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id INTEGER NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    company_id INTEGER NOT NULL,
    student_id INTEGER NOT NULL,
    message_type TEXT NOT NULL,
    message TEXT NOT NULL,
    contact_email TEXT,
    created_at TEXT NOT NULL
);
";

/// Process-scoped database handle, created once at startup and shared with
/// every handler through `web::Data`. All access goes through the mutex; at
/// this scale serializing statements is acceptable and keeps rusqlite's
/// single connection safe across actix workers.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Database, ApiError> {
        Database::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Database, ApiError> {
        Database::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Database, ApiError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.conn
            .lock()
            .map_err(|_| ApiError::Internal("database mutex poisoned".to_string()))
    }
}

/// Timestamps are written by the application, not SQL defaults, so every
/// table carries the same RFC 3339 format.
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
