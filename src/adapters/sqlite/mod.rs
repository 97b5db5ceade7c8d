//! SQLite adapter: Implementation of RecordStore.
//!
//! Provides durable persistence for accounts, owned records, access grants
//! and notifications as a relational table set.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex surfaces as
//! `StorageError::LockPoisoned` on every later call instead of panicking.
//!
//! # Encoding
//!
//! Calendar dates are stored as `YYYY-MM-DD` text, timestamps as RFC 3339
//! text, booleans as integers.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};

use super::StorageError;
use crate::domain::{
    AccessGrant, Account, AccountId, ClinicianProfile, FamilyMember, GrantId, GrantStatus,
    HistoryStatus, MedicalHistoryEntry, NewAccount, NewFamilyMember, NewGrant, NewMedicalHistory,
    NewNotification, NewVaccine, Notification, NotificationId, NotificationKind, Role,
    VaccineEntry,
};
use crate::ports::RecordStore;

const ACCOUNT_COLUMNS: &str = "id, username, password_hash, full_name, date_of_birth, gender, \
     blood_type, is_doctor, license_number, specialization, hospital";

const GRANT_COLUMNS: &str = "id, patient_id, doctor_id, status, is_active, created_at, expires_at";

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, type, related_id, is_read, created_at";

/// SQLite storage adapter.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                full_name TEXT NOT NULL,
                date_of_birth TEXT NOT NULL,
                gender TEXT NOT NULL,
                blood_type TEXT,
                is_doctor INTEGER NOT NULL DEFAULT 0,
                license_number TEXT UNIQUE,
                specialization TEXT,
                hospital TEXT
            );

            CREATE TABLE IF NOT EXISTS medical_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                condition TEXT NOT NULL,
                diagnosis_date TEXT NOT NULL,
                notes TEXT,
                status TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vaccines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                date_administered TEXT NOT NULL,
                provider TEXT,
                batch_number TEXT,
                next_due_date TEXT
            );

            CREATE TABLE IF NOT EXISTS family_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                relationship TEXT NOT NULL,
                date_of_birth TEXT NOT NULL,
                has_access INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS doctor_access (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_id INTEGER NOT NULL REFERENCES users(id),
                doctor_id INTEGER NOT NULL REFERENCES users(id),
                status TEXT NOT NULL DEFAULT 'pending',
                is_active INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                expires_at TEXT
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                type TEXT NOT NULL,
                related_id INTEGER,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_medical_history_user ON medical_history(user_id);
            CREATE INDEX IF NOT EXISTS idx_vaccines_user ON vaccines(user_id);
            CREATE INDEX IF NOT EXISTS idx_family_members_user ON family_members(user_id);
            CREATE INDEX IF NOT EXISTS idx_doctor_access_patient ON doctor_access(patient_id);
            CREATE INDEX IF NOT EXISTS idx_doctor_access_doctor ON doctor_access(doctor_id);
            CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
            ",
        )?;

        Ok(())
    }
}

/// Map unique-constraint violations to `Conflict`, everything else
/// (NOT NULL, foreign keys, I/O) to `Database`.
///
/// The conflict message is fixed text; SQLite's own message names tables
/// and columns and stays in the server log.
fn classify(err: rusqlite::Error) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            let detail = message.as_deref().unwrap_or_default();
            tracing::debug!("Unique constraint violated: {}", detail);

            let conflict = if detail.contains("license_number") {
                "License number already registered"
            } else if detail.contains("username") {
                "Username already exists"
            } else {
                "Record already exists"
            };
            StorageError::Conflict(conflict.to_string())
        }
        _ => StorageError::Database(err),
    }
}

fn fetch_grant(conn: &Connection, id: GrantId) -> Result<Option<AccessGrant>, StorageError> {
    let row = conn
        .query_row(
            &format!("SELECT {GRANT_COLUMNS} FROM doctor_access WHERE id = ?1"),
            params![id.0],
            GrantRow::read,
        )
        .optional()?;

    row.map(GrantRow::into_grant).transpose()
}

fn parse_date(value: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| StorageError::Serialization(format!("bad date {value:?}: {e}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp {value:?}: {e}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Raw `users` row, converted outside the rusqlite row closure so that
/// decoding failures become `StorageError::Serialization`.
struct AccountRow {
    id: i64,
    username: String,
    password_hash: String,
    full_name: String,
    date_of_birth: String,
    gender: String,
    blood_type: Option<String>,
    is_doctor: bool,
    license_number: Option<String>,
    specialization: Option<String>,
    hospital: Option<String>,
}

impl AccountRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            full_name: row.get(3)?,
            date_of_birth: row.get(4)?,
            gender: row.get(5)?,
            blood_type: row.get(6)?,
            is_doctor: row.get::<_, i64>(7)? != 0,
            license_number: row.get(8)?,
            specialization: row.get(9)?,
            hospital: row.get(10)?,
        })
    }

    fn into_account(self) -> Result<Account, StorageError> {
        let role = if self.is_doctor {
            Role::Clinician(ClinicianProfile {
                license_number: self.license_number.unwrap_or_default(),
                specialization: self.specialization.unwrap_or_default(),
                hospital: self.hospital.unwrap_or_default(),
            })
        } else {
            Role::Patient
        };

        Ok(Account {
            id: AccountId(self.id),
            username: self.username,
            password_hash: self.password_hash,
            full_name: self.full_name,
            date_of_birth: parse_date(&self.date_of_birth)?,
            gender: self.gender,
            blood_type: self.blood_type,
            role,
        })
    }
}

struct GrantRow {
    id: i64,
    patient_id: i64,
    doctor_id: i64,
    status: String,
    is_active: bool,
    created_at: String,
    expires_at: Option<String>,
}

impl GrantRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            status: row.get(3)?,
            is_active: row.get::<_, i64>(4)? != 0,
            created_at: row.get(5)?,
            expires_at: row.get(6)?,
        })
    }

    fn into_grant(self) -> Result<AccessGrant, StorageError> {
        let status = GrantStatus::parse(&self.status).ok_or_else(|| {
            StorageError::Serialization(format!("unknown grant status {:?}", self.status))
        })?;

        Ok(AccessGrant {
            id: GrantId(self.id),
            patient_id: AccountId(self.patient_id),
            clinician_id: AccountId(self.doctor_id),
            status,
            is_active: self.is_active,
            created_at: parse_timestamp(&self.created_at)?,
            expires_at: self.expires_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

struct NotificationRow {
    id: i64,
    user_id: i64,
    title: String,
    message: String,
    kind: String,
    related_id: Option<i64>,
    is_read: bool,
    created_at: String,
}

impl NotificationRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            message: row.get(3)?,
            kind: row.get(4)?,
            related_id: row.get(5)?,
            is_read: row.get::<_, i64>(6)? != 0,
            created_at: row.get(7)?,
        })
    }

    fn into_notification(self) -> Result<Notification, StorageError> {
        let kind = NotificationKind::parse(&self.kind).ok_or_else(|| {
            StorageError::Serialization(format!("unknown notification type {:?}", self.kind))
        })?;

        Ok(Notification {
            id: NotificationId(self.id),
            user_id: AccountId(self.user_id),
            title: self.title,
            message: self.message,
            kind,
            related_id: self.related_id.map(GrantId),
            is_read: self.is_read,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl SqliteStore {
    fn query_accounts(
        &self,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Account>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE {filter} ORDER BY id"
        ))?;

        let rows = stmt
            .query_map(args, AccountRow::read)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(AccountRow::into_account).collect()
    }

    fn query_grants(&self, filter: &str, order: &str, id: i64) -> Result<Vec<AccessGrant>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {GRANT_COLUMNS} FROM doctor_access WHERE {filter} ORDER BY {order}"
        ))?;

        let rows = stmt
            .query_map(params![id], GrantRow::read)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(GrantRow::into_grant).collect()
    }
}

impl RecordStore for SqliteStore {
    type Error = StorageError;

    fn create_account(&self, account: NewAccount) -> Result<Account, Self::Error> {
        let conn = self.conn()?;
        let profile = account.role.clinician_profile();

        conn.execute(
            r"
            INSERT INTO users (
                username, password_hash, full_name, date_of_birth, gender,
                blood_type, is_doctor, license_number, specialization, hospital
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                account.username,
                account.password_hash,
                account.full_name,
                format_date(account.date_of_birth),
                account.gender,
                account.blood_type,
                account.role.is_clinician() as i64,
                profile.map(|p| p.license_number.as_str()),
                profile.map(|p| p.specialization.as_str()),
                profile.map(|p| p.hospital.as_str()),
            ],
        )
        .map_err(classify)?;

        let id = AccountId(conn.last_insert_rowid());
        tracing::debug!("Inserted account {}", id);
        Ok(account.into_account(id))
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, Self::Error> {
        Ok(self.query_accounts("id = ?1", params![id.0])?.into_iter().next())
    }

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, Self::Error> {
        Ok(self
            .query_accounts("username = ?1", params![username])?
            .into_iter()
            .next())
    }

    fn find_clinician_by_license(
        &self,
        license_number: &str,
    ) -> Result<Option<Account>, Self::Error> {
        Ok(self
            .query_accounts("is_doctor = 1 AND license_number = ?1", params![license_number])?
            .into_iter()
            .next())
    }

    fn list_clinicians(&self) -> Result<Vec<Account>, Self::Error> {
        self.query_accounts("is_doctor = 1", params![])
    }

    fn add_medical_history(
        &self,
        owner: AccountId,
        entry: NewMedicalHistory,
    ) -> Result<MedicalHistoryEntry, Self::Error> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT INTO medical_history (user_id, condition, diagnosis_date, notes, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                owner.0,
                entry.condition,
                format_date(entry.diagnosis_date),
                entry.notes,
                entry.status.as_str(),
            ],
        )
        .map_err(classify)?;

        Ok(entry.into_entry(conn.last_insert_rowid(), owner))
    }

    fn list_medical_history(
        &self,
        owner: AccountId,
    ) -> Result<Vec<MedicalHistoryEntry>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, condition, diagnosis_date, notes, status
            FROM medical_history
            WHERE user_id = ?1
            ORDER BY id
            ",
        )?;

        let rows = stmt
            .query_map(params![owner.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, condition, diagnosis_date, notes, status)| {
                let status = HistoryStatus::parse(&status).ok_or_else(|| {
                    StorageError::Serialization(format!("unknown history status {status:?}"))
                })?;
                Ok(MedicalHistoryEntry {
                    id,
                    user_id: owner,
                    condition,
                    diagnosis_date: parse_date(&diagnosis_date)?,
                    notes,
                    status,
                })
            })
            .collect()
    }

    fn add_vaccine(
        &self,
        owner: AccountId,
        vaccine: NewVaccine,
    ) -> Result<VaccineEntry, Self::Error> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT INTO vaccines (
                user_id, name, date_administered, provider, batch_number, next_due_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                owner.0,
                vaccine.name,
                format_date(vaccine.date_administered),
                vaccine.provider,
                vaccine.batch_number,
                vaccine.next_due_date.map(format_date),
            ],
        )
        .map_err(classify)?;

        Ok(vaccine.into_entry(conn.last_insert_rowid(), owner))
    }

    fn list_vaccines(&self, owner: AccountId) -> Result<Vec<VaccineEntry>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, name, date_administered, provider, batch_number, next_due_date
            FROM vaccines
            WHERE user_id = ?1
            ORDER BY id
            ",
        )?;

        let rows = stmt
            .query_map(params![owner.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, name, date_administered, provider, batch_number, next_due_date)| {
                    Ok(VaccineEntry {
                        id,
                        user_id: owner,
                        name,
                        date_administered: parse_date(&date_administered)?,
                        provider,
                        batch_number,
                        next_due_date: next_due_date.as_deref().map(parse_date).transpose()?,
                    })
                },
            )
            .collect()
    }

    fn add_family_member(
        &self,
        owner: AccountId,
        member: NewFamilyMember,
    ) -> Result<FamilyMember, Self::Error> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT INTO family_members (user_id, name, relationship, date_of_birth, has_access)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                owner.0,
                member.name,
                member.relationship,
                format_date(member.date_of_birth),
                member.has_access as i64,
            ],
        )
        .map_err(classify)?;

        Ok(member.into_entry(conn.last_insert_rowid(), owner))
    }

    fn list_family_members(&self, owner: AccountId) -> Result<Vec<FamilyMember>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, name, relationship, date_of_birth, has_access
            FROM family_members
            WHERE user_id = ?1
            ORDER BY id
            ",
        )?;

        let rows = stmt
            .query_map(params![owner.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)? != 0,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, relationship, date_of_birth, has_access)| {
                Ok(FamilyMember {
                    id,
                    user_id: owner,
                    name,
                    relationship,
                    date_of_birth: parse_date(&date_of_birth)?,
                    has_access,
                })
            })
            .collect()
    }

    fn create_grant(&self, grant: NewGrant) -> Result<AccessGrant, Self::Error> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT INTO doctor_access (patient_id, doctor_id, status, is_active, created_at, expires_at)
            VALUES (?1, ?2, 'pending', 0, ?3, ?4)
            ",
            params![
                grant.patient_id.0,
                grant.clinician_id.0,
                grant.created_at.to_rfc3339(),
                grant.expires_at.map(|e| e.to_rfc3339()),
            ],
        )
        .map_err(classify)?;

        Ok(grant.into_grant(GrantId(conn.last_insert_rowid())))
    }

    fn get_grant(&self, id: GrantId) -> Result<Option<AccessGrant>, Self::Error> {
        fetch_grant(&*self.conn()?, id)
    }

    fn resolve_grant(
        &self,
        id: GrantId,
        clinician: AccountId,
        accepted: bool,
    ) -> Result<Option<AccessGrant>, Self::Error> {
        let status = if accepted {
            GrantStatus::Accepted
        } else {
            GrantStatus::Rejected
        };

        // The connection guard is held across the update and the re-read.
        let conn = self.conn()?;
        let changed = conn.execute(
            r"
            UPDATE doctor_access SET status = ?1, is_active = ?2
            WHERE id = ?3 AND doctor_id = ?4 AND status = 'pending'
            ",
            params![status.as_str(), accepted as i64, id.0, clinician.0],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        fetch_grant(&conn, id)
    }

    fn deactivate_grant(&self, id: GrantId) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r"
            UPDATE doctor_access SET is_active = 0
            WHERE id = ?1 AND status = 'accepted' AND is_active = 1
            ",
            params![id.0],
        )?;
        Ok(changed > 0)
    }

    fn grants_for_patient(&self, patient: AccountId) -> Result<Vec<AccessGrant>, Self::Error> {
        self.query_grants("patient_id = ?1", "id DESC", patient.0)
    }

    fn grants_for_clinician(&self, clinician: AccountId) -> Result<Vec<AccessGrant>, Self::Error> {
        self.query_grants("doctor_id = ?1", "id", clinician.0)
    }

    fn add_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, Self::Error> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT INTO notifications (user_id, title, message, type, related_id, is_read, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            ",
            params![
                notification.recipient.0,
                notification.title,
                notification.message,
                notification.kind.as_str(),
                notification.related_id.map(|id| id.0),
                notification.created_at.to_rfc3339(),
            ],
        )
        .map_err(classify)?;

        Ok(notification.into_notification(NotificationId(conn.last_insert_rowid())))
    }

    fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>, Self::Error> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                params![id.0],
                NotificationRow::read,
            )
            .optional()?;

        row.map(NotificationRow::into_notification).transpose()
    }

    fn list_notifications(&self, recipient: AccountId) -> Result<Vec<Notification>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        ))?;

        let rows = stmt
            .query_map(params![recipient.0], NotificationRow::read)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    fn mark_notification_read(&self, id: NotificationId) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            params![id.0],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn patient(username: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            password_hash: "$argon2id$test".to_string(),
            full_name: format!("{username} patient"),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 4).expect("valid date"),
            gender: "female".to_string(),
            blood_type: Some("A-".to_string()),
            role: Role::Patient,
        }
    }

    fn clinician(username: &str, license: &str) -> NewAccount {
        NewAccount {
            role: Role::Clinician(ClinicianProfile {
                license_number: license.to_string(),
                specialization: "Cardiology".to_string(),
                hospital: "St. Mary".to_string(),
            }),
            blood_type: None,
            ..patient(username)
        }
    }

    #[test]
    fn test_account_roundtrip() {
        let store = SqliteStore::in_memory().expect("Should create db");

        let created = store.create_account(clinician("drjones", "MD-7")).expect("Should create");
        let loaded = store
            .get_account(created.id)
            .expect("Should load")
            .expect("Should exist");
        assert_eq!(loaded, created);

        let by_license = store
            .find_clinician_by_license("MD-7")
            .expect("Should query")
            .expect("Should exist");
        assert_eq!(by_license.id, created.id);
        assert!(store.get_account(AccountId(99)).expect("Should load").is_none());
    }

    #[test]
    fn test_duplicate_username_is_conflict() {
        let store = SqliteStore::in_memory().expect("Should create db");
        store.create_account(patient("alice")).expect("Should create");

        let duplicate = store.create_account(patient("alice"));
        assert!(matches!(duplicate, Err(StorageError::Conflict(_))));
    }

    #[test]
    fn test_duplicate_license_is_conflict() {
        let store = SqliteStore::in_memory().expect("Should create db");
        store.create_account(clinician("a", "MD-1")).expect("Should create");

        let duplicate = store.create_account(clinician("b", "MD-1"));
        match duplicate {
            Err(StorageError::Conflict(message)) => {
                assert_eq!(message, "License number already registered");
            }
            other => panic!("Expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_key_failure_is_not_conflict() {
        let store = SqliteStore::in_memory().expect("Should create db");
        let entry = NewMedicalHistory {
            condition: "Asthma".to_string(),
            diagnosis_date: NaiveDate::from_ymd_opt(2012, 3, 4).expect("valid date"),
            notes: None,
            status: HistoryStatus::Chronic,
        };

        let result = store.add_medical_history(AccountId(404), entry);
        assert!(matches!(result, Err(StorageError::Database(_))));
    }

    #[test]
    fn test_records_roundtrip() {
        let store = SqliteStore::in_memory().expect("Should create db");
        let owner = store.create_account(patient("alice")).expect("Should create").id;

        let mut history = Vec::new();
        for (condition, status) in [
            ("Hypertension", HistoryStatus::Active),
            ("Fractured wrist", HistoryStatus::Resolved),
            ("Type 2 diabetes", HistoryStatus::Chronic),
        ] {
            let entry = NewMedicalHistory {
                condition: condition.to_string(),
                diagnosis_date: NaiveDate::from_ymd_opt(2015, 9, 12).expect("valid date"),
                notes: Some(format!("{condition} notes")),
                status,
            };
            history.push(store.add_medical_history(owner, entry).expect("Should add"));
        }
        assert_eq!(store.list_medical_history(owner).expect("Should list"), history);

        let vaccine = NewVaccine {
            name: "Hepatitis B".to_string(),
            date_administered: NaiveDate::from_ymd_opt(2021, 2, 3).expect("valid date"),
            provider: None,
            batch_number: Some("HB-221".to_string()),
            next_due_date: Some(NaiveDate::from_ymd_opt(2031, 2, 3).expect("valid date")),
        };
        let created = store.add_vaccine(owner, vaccine).expect("Should add");
        assert_eq!(store.list_vaccines(owner).expect("Should list"), vec![created]);

        let member = NewFamilyMember {
            name: "Carol".to_string(),
            relationship: "mother".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1960, 7, 8).expect("valid date"),
            has_access: true,
        };
        let created = store.add_family_member(owner, member).expect("Should add");
        assert_eq!(store.list_family_members(owner).expect("Should list"), vec![created]);
    }

    #[test]
    fn test_grant_lifecycle() {
        let store = SqliteStore::in_memory().expect("Should create db");
        let patient_id = store.create_account(patient("alice")).expect("Should create").id;
        let doctor_id = store
            .create_account(clinician("house", "MD-100"))
            .expect("Should create")
            .id;

        let created_at = Utc::now();
        let grant = store
            .create_grant(NewGrant {
                patient_id,
                clinician_id: doctor_id,
                created_at,
                expires_at: Some(created_at + Duration::days(30)),
            })
            .expect("Should create grant");
        assert!(grant.is_pending());

        // Only the addressed clinician can answer.
        assert!(store
            .resolve_grant(grant.id, patient_id, true)
            .expect("Should run")
            .is_none());

        let resolved = store
            .resolve_grant(grant.id, doctor_id, true)
            .expect("Should run")
            .expect("Should resolve pending grant");
        assert_eq!(resolved.status, GrantStatus::Accepted);

        let loaded = store
            .get_grant(grant.id)
            .expect("Should load")
            .expect("Should exist");
        assert_eq!(loaded, resolved);
        assert!(loaded.is_active);
        assert!(loaded.authorizes_at(Utc::now()));

        assert_eq!(store.grants_for_patient(patient_id).expect("Should list").len(), 1);
        assert_eq!(store.grants_for_clinician(doctor_id).expect("Should list").len(), 1);

        assert!(store.deactivate_grant(grant.id).expect("Should run"));
        assert!(!store.deactivate_grant(grant.id).expect("Should run"));
        let revoked = store
            .get_grant(grant.id)
            .expect("Should load")
            .expect("Should exist");
        assert_eq!(revoked.status, GrantStatus::Accepted);
        assert!(!revoked.is_active);
    }

    #[test]
    fn test_stale_answer_does_not_overwrite() {
        let store = SqliteStore::in_memory().expect("Should create db");
        let patient_id = store.create_account(patient("alice")).expect("Should create").id;
        let doctor_id = store
            .create_account(clinician("house", "MD-100"))
            .expect("Should create")
            .id;
        let grant = store
            .create_grant(NewGrant {
                patient_id,
                clinician_id: doctor_id,
                created_at: Utc::now(),
                expires_at: None,
            })
            .expect("Should create grant");

        // Both callers read the grant while it was pending.
        let stale = store
            .get_grant(grant.id)
            .expect("Should load")
            .expect("Should exist");
        assert!(stale.is_pending());

        store
            .resolve_grant(grant.id, doctor_id, false)
            .expect("Should run")
            .expect("Should resolve pending grant");
        assert!(store
            .resolve_grant(stale.id, doctor_id, true)
            .expect("Should run")
            .is_none());

        let loaded = store
            .get_grant(grant.id)
            .expect("Should load")
            .expect("Should exist");
        assert_eq!(loaded.status, GrantStatus::Rejected);
        assert!(!loaded.is_active);
    }

    #[test]
    fn test_notification_read_flag() {
        let store = SqliteStore::in_memory().expect("Should create db");
        let recipient = store.create_account(patient("alice")).expect("Should create").id;

        let notification = store
            .add_notification(NewNotification {
                recipient,
                title: "Access request accepted".to_string(),
                message: "Your request was accepted".to_string(),
                kind: NotificationKind::AccessResponse,
                related_id: Some(GrantId(1)),
                created_at: Utc::now(),
            })
            .expect("Should add");
        assert!(!notification.is_read);

        assert!(store.mark_notification_read(notification.id).expect("Should mark"));
        assert!(store.mark_notification_read(notification.id).expect("Should mark"));
        assert!(!store.mark_notification_read(NotificationId(999)).expect("Should run"));

        let listed = store.list_notifications(recipient).expect("Should list");
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_read);
        assert_eq!(listed[0].related_id, Some(GrantId(1)));
    }
}
