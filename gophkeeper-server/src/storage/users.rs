//! User records: unique-login accounts with password hashes.

use super::Storage;
use gophkeeper_core::DomainError;
use rusqlite::OptionalExtension;

/// A registered account. The password is stored only as a bcrypt digest.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub login: String,
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Storage {
    /// Insert a new user. A taken login yields `UserAlreadyExists`.
    pub fn create_user(&self, user: &User) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO users (id, login, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                user.id,
                user.login,
                user.password_hash,
                user.created_at,
                user.updated_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DomainError::UserAlreadyExists)
            }
            Err(e) => Err(DomainError::Storage(e.to_string())),
        }
    }

    pub fn get_user_by_login(&self, login: &str) -> Result<User, DomainError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, login, password_hash, created_at, updated_at
             FROM users WHERE login = ?1",
            [login],
            Self::map_user,
        )
        .optional()
        .map_err(|e| DomainError::Storage(e.to_string()))?
        .ok_or(DomainError::UserNotFound)
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<User, DomainError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, login, password_hash, created_at, updated_at
             FROM users WHERE id = ?1",
            [id],
            Self::map_user,
        )
        .optional()
        .map_err(|e| DomainError::Storage(e.to_string()))?
        .ok_or(DomainError::UserNotFound)
    }

    fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            login: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, login: &str) -> User {
        User {
            id: id.to_string(),
            login: login.to_string(),
            password_hash: "$2b$04$stub".to_string(),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    #[test]
    fn create_and_fetch() {
        let storage = Storage::in_memory().unwrap();
        storage.create_user(&user("u1", "alice")).unwrap();

        let by_login = storage.get_user_by_login("alice").unwrap();
        assert_eq!(by_login.id, "u1");

        let by_id = storage.get_user_by_id("u1").unwrap();
        assert_eq!(by_id.login, "alice");
    }

    #[test]
    fn duplicate_login_rejected() {
        let storage = Storage::in_memory().unwrap();
        storage.create_user(&user("u1", "alice")).unwrap();

        assert!(matches!(
            storage.create_user(&user("u2", "alice")),
            Err(DomainError::UserAlreadyExists)
        ));
    }

    #[test]
    fn login_is_case_sensitive() {
        let storage = Storage::in_memory().unwrap();
        storage.create_user(&user("u1", "alice")).unwrap();

        assert!(matches!(
            storage.get_user_by_login("Alice"),
            Err(DomainError::UserNotFound)
        ));
    }

    #[test]
    fn missing_user_not_found() {
        let storage = Storage::in_memory().unwrap();
        assert!(matches!(
            storage.get_user_by_id("nope"),
            Err(DomainError::UserNotFound)
        ));
    }
}
