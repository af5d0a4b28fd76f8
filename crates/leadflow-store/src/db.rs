//! Lead board SQLite database.
//!
//! One file holds the seller accounts and the leads they own. The campaign
//! engine only ever touches the `status` column, through [`LeadStatusStore`].

use async_trait::async_trait;
use chrono::NaiveDate;
use leadflow_core::error::{LeadflowError, Result};
use leadflow_core::traits::LeadStatusStore;
use leadflow_core::types::{
    DailyMetric, Lead, LeadPatch, LeadStatus, NewLead, NewUser, User, UserPatch,
};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

const LEAD_COLUMNS: &str = "id, name, category, contact, first_contact_date, notes, status, tag, \
                            meeting_date, user_id, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, role, daily_goal, active, created_at, updated_at";

/// Lead board database.
pub struct LeadDb {
    conn: Mutex<Connection>,
}

fn db_err(context: &'static str) -> impl FnOnce(rusqlite::Error) -> LeadflowError {
    move |e| LeadflowError::Database(format!("{context}: {e}"))
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = LeadflowError>,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        contact: row.get(3)?,
        first_contact_date: row.get(4)?,
        notes: row.get(5)?,
        status: parse_column(row, 6)?,
        tag: parse_column(row, 7)?,
        meeting_date: row.get(8)?,
        user_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        daily_goal: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

/// Empty strings are stored as NULL.
fn optional_text(value: &str) -> Value {
    let trimmed = value.trim();
    if trimmed.is_empty() { Value::Null } else { text(trimmed) }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl LeadDb {
    /// Open or create the database at `path` (`:memory:` works too).
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err("open"))?;

        // WAL is best-effort: unsupported for in-memory databases.
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(db_err("foreign keys"))?;

        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        db.seed_admin()?;
        tracing::debug!("Lead database ready at {}", path.display());
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LeadflowError::Database(format!("Lock: {e}")))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'vendedor',
                daily_goal INTEGER NOT NULL DEFAULT 5,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS leads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT,
                contact TEXT,
                first_contact_date TEXT DEFAULT (date('now')),
                notes TEXT,
                status TEXT NOT NULL DEFAULT 'lista_leads',
                tag TEXT NOT NULL DEFAULT 'morno',
                meeting_date TEXT,
                user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status);
            CREATE INDEX IF NOT EXISTS idx_leads_user_id ON leads(user_id);
            CREATE INDEX IF NOT EXISTS idx_leads_created_at ON leads(created_at);
            ",
        )
        .map_err(db_err("Migration error"))?;
        Ok(())
    }

    fn seed_admin(&self) -> Result<()> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .map_err(db_err("count users"))?;
        if count > 0 {
            return Ok(());
        }
        conn.execute(
            "INSERT INTO users (name, email, role, daily_goal) VALUES (?1, ?2, ?3, ?4)",
            params!["Administrador", "admin@sistema.com", "gestor", 10],
        )
        .map_err(db_err("seed admin"))?;
        tracing::info!("👤 Seeded default admin user");
        Ok(())
    }

    // ── Leads ─────────────────────────────────

    /// All leads, newest first (board order).
    pub fn list_leads(&self) -> Result<Vec<Lead>> {
        self.query_leads("ORDER BY created_at DESC, id DESC")
    }

    /// All leads in creation order. Campaign recipient sets are built from this.
    pub fn list_leads_in_order(&self) -> Result<Vec<Lead>> {
        self.query_leads("ORDER BY created_at ASC, id ASC")
    }

    fn query_leads(&self, order: &str) -> Result<Vec<Lead>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads {order}"))
            .map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map([], lead_from_row)
            .map_err(db_err("Query"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read lead"))
    }

    pub fn get_lead(&self, id: i64) -> Result<Lead> {
        let conn = self.lock()?;
        Self::fetch_lead(&conn, id)
    }

    fn fetch_lead(conn: &Connection, id: i64) -> Result<Lead> {
        conn.query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id=?1"),
            params![id],
            lead_from_row,
        )
        .optional()
        .map_err(db_err("Get lead"))?
        .ok_or_else(|| LeadflowError::NotFound(format!("lead {id}")))
    }

    pub fn create_lead(&self, lead: &NewLead) -> Result<Lead> {
        let name = lead.name.trim();
        if name.is_empty() {
            return Err(LeadflowError::Validation("lead name is required".into()));
        }

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO leads (name, category, contact, first_contact_date, notes, status, tag,
                                meeting_date, user_id)
             VALUES (?1, ?2, ?3, COALESCE(?4, date('now')), ?5, ?6, ?7, ?8, ?9)",
            params![
                name,
                lead.category.as_deref().map(optional_text),
                lead.contact.as_deref().map(optional_text),
                lead.first_contact_date.as_deref().map(optional_text),
                lead.notes.as_deref().map(optional_text),
                lead.status.as_str(),
                lead.tag.as_str(),
                lead.meeting_date.as_deref().map(optional_text),
                lead.user_id,
            ],
        )
        .map_err(db_err("Create lead"))?;
        let id = conn.last_insert_rowid();
        tracing::debug!("Created lead {id} ({name})");
        Self::fetch_lead(&conn, id)
    }

    /// Apply a partial update. Fields absent from `patch` keep their values.
    pub fn update_lead(&self, id: i64, patch: &LeadPatch) -> Result<Lead> {
        if patch.is_empty() {
            return Err(LeadflowError::Validation("no fields to update".into()));
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(name) = &patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(LeadflowError::Validation("lead name cannot be empty".into()));
            }
            sets.push("name");
            values.push(text(name));
        }
        let optional_columns = [
            ("category", &patch.category),
            ("contact", &patch.contact),
            ("first_contact_date", &patch.first_contact_date),
            ("notes", &patch.notes),
            ("meeting_date", &patch.meeting_date),
        ];
        for (column, value) in optional_columns {
            if let Some(value) = value {
                sets.push(column);
                values.push(optional_text(value));
            }
        }
        if let Some(status) = patch.status {
            sets.push("status");
            values.push(text(status.as_str()));
        }
        if let Some(tag) = patch.tag {
            sets.push("tag");
            values.push(text(tag.as_str()));
        }
        if let Some(user_id) = patch.user_id {
            sets.push("user_id");
            values.push(Value::Integer(user_id));
        }

        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column}=?{}", i + 1))
            .collect();
        values.push(Value::Integer(id));
        let sql = format!(
            "UPDATE leads SET {}, updated_at=datetime('now') WHERE id=?{}",
            assignments.join(", "),
            values.len()
        );

        let conn = self.lock()?;
        let changed = conn
            .execute(&sql, params_from_iter(values))
            .map_err(db_err("Update lead"))?;
        if changed == 0 {
            return Err(LeadflowError::NotFound(format!("lead {id}")));
        }
        Self::fetch_lead(&conn, id)
    }

    /// Move a lead to another column. Idempotent.
    pub fn update_lead_status(&self, id: i64, status: LeadStatus) -> Result<Lead> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE leads SET status=?1, updated_at=datetime('now') WHERE id=?2",
                params![status.as_str(), id],
            )
            .map_err(db_err("Update status"))?;
        if changed == 0 {
            return Err(LeadflowError::NotFound(format!("lead {id}")));
        }
        Self::fetch_lead(&conn, id)
    }

    pub fn delete_lead(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM leads WHERE id=?1", params![id])
            .map_err(db_err("Delete lead"))?;
        if changed == 0 {
            return Err(LeadflowError::NotFound(format!("lead {id}")));
        }
        Ok(())
    }

    /// Distinct non-empty categories, sorted.
    pub fn categories(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT TRIM(category) AS c FROM leads
                 WHERE category IS NOT NULL AND TRIM(category) != ''
                 ORDER BY c",
            )
            .map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err("Query"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read category"))
    }

    // ── Users ─────────────────────────────────

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name"))
            .map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map([], user_from_row)
            .map_err(db_err("Query"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read user"))
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.lock()?;
        Self::fetch_user(&conn, id)
    }

    fn fetch_user(conn: &Connection, id: i64) -> Result<User> {
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id=?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(db_err("Get user"))?
        .ok_or_else(|| LeadflowError::NotFound(format!("user {id}")))
    }

    pub fn create_user(&self, user: &NewUser) -> Result<User> {
        let name = user.name.trim();
        let email = user.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(LeadflowError::Validation("name and email are required".into()));
        }

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (name, email, role, daily_goal) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, user.role, user.daily_goal],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                LeadflowError::Validation(format!("email '{email}' is already registered"))
            } else {
                LeadflowError::Database(format!("Create user: {e}"))
            }
        })?;
        Self::fetch_user(&conn, conn.last_insert_rowid())
    }

    pub fn update_user(&self, id: i64, patch: &UserPatch) -> Result<User> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(name) = &patch.name {
            sets.push("name");
            values.push(text(name.trim()));
        }
        if let Some(email) = &patch.email {
            sets.push("email");
            values.push(text(email.trim()));
        }
        if let Some(role) = &patch.role {
            sets.push("role");
            values.push(text(role));
        }
        if let Some(goal) = patch.daily_goal {
            sets.push("daily_goal");
            values.push(Value::Integer(goal));
        }
        if let Some(active) = patch.active {
            sets.push("active");
            values.push(Value::Integer(active as i64));
        }
        if sets.is_empty() {
            return Err(LeadflowError::Validation("no fields to update".into()));
        }

        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column}=?{}", i + 1))
            .collect();
        values.push(Value::Integer(id));
        let sql = format!(
            "UPDATE users SET {}, updated_at=datetime('now') WHERE id=?{}",
            assignments.join(", "),
            values.len()
        );

        let conn = self.lock()?;
        let changed = conn.execute(&sql, params_from_iter(values)).map_err(|e| {
            if is_unique_violation(&e) {
                LeadflowError::Validation("email is already registered".into())
            } else {
                LeadflowError::Database(format!("Update user: {e}"))
            }
        })?;
        if changed == 0 {
            return Err(LeadflowError::NotFound(format!("user {id}")));
        }
        Self::fetch_user(&conn, id)
    }

    /// Delete a seller. Their leads stay on the board, unassigned.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM users WHERE id=?1", params![id])
            .map_err(db_err("Delete user"))?;
        if changed == 0 {
            return Err(LeadflowError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    // ── Metrics ───────────────────────────────

    /// Leads created on `date` (YYYY-MM-DD) by each active seller, against
    /// their daily goal. Sorted by percentage, best first, then by name.
    pub fn daily_metrics(&self, date: &str, user_id: Option<i64>) -> Result<Vec<DailyMetric>> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| LeadflowError::Validation(format!("invalid date '{date}', expected YYYY-MM-DD")))?;

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT u.id, u.name, u.daily_goal, COUNT(l.id)
                 FROM users u
                 LEFT JOIN leads l ON l.user_id = u.id AND date(l.created_at) = ?1
                 WHERE u.active = 1 AND (?2 IS NULL OR u.id = ?2)
                 GROUP BY u.id, u.name, u.daily_goal",
            )
            .map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map(params![date, user_id], |row| {
                let daily_goal: i64 = row.get(2)?;
                let leads_created: i64 = row.get(3)?;
                let percentage = if daily_goal > 0 {
                    round2(leads_created as f64 * 100.0 / daily_goal as f64)
                } else {
                    0.0
                };
                Ok(DailyMetric {
                    user_id: row.get(0)?,
                    user_name: row.get(1)?,
                    date: date.to_string(),
                    leads_created,
                    daily_goal,
                    percentage,
                })
            })
            .map_err(db_err("Query"))?;

        let mut metrics = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read metric"))?;
        metrics.sort_by(|a, b| {
            b.percentage
                .total_cmp(&a.percentage)
                .then_with(|| a.user_name.cmp(&b.user_name))
        });
        Ok(metrics)
    }
}

#[async_trait]
impl LeadStatusStore for LeadDb {
    async fn set_status(&self, lead_id: i64, status: LeadStatus) -> Result<()> {
        self.update_lead_status(lead_id, status).map(|_| ())
    }
}
