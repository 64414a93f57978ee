//! User directory as kept on disk
//!
//! `users.json` maps each username to `{password, role, name}`.
//! It is seeded with the default users on first start.

use attendance_protocol::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::BTreeMap;

use crate::{
    authentication::{HashError, PasswordHash},
    storage::{FileError, JsonFile},
    user_management::{StoredUser, UserId},
};

const DEFAULT_USERS: &[(&str, &str, Role, &str)] = &[
    ("admin", "admin123", Role::Admin, "Admin User"),
    ("john", "john123", Role::User, "John Doe"),
    ("jane", "jane123", Role::User, "Jane Smith"),
    ("bob", "bob123", Role::User, "Bob Johnson"),
    ("alice", "alice123", Role::User, "Alice Williams"),
];

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error("cannot hash the password of {username:?}: {source}")]
    Hash { username: UserId, source: HashError },
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticUserDatabase {
    pub users: BTreeMap<UserId, StoredUser>,
}

impl StaticUserDatabase {
    pub fn defaults() -> Result<Self, DirectoryError> {
        let users = DEFAULT_USERS
            .iter()
            .map(|&(username, password, role, name)| {
                let hash = PasswordHash::new(password).map_err(|source| DirectoryError::Hash {
                    username: username.into(),
                    source,
                })?;
                let user = StoredUser {
                    password: hash.encode(),
                    role,
                    name: name.into(),
                };
                Ok((username.to_owned(), user))
            })
            .collect::<Result<_, DirectoryError>>()?;
        Ok(StaticUserDatabase { users })
    }

    pub fn load_or_seed(file: &JsonFile) -> Result<Self, DirectoryError> {
        if let Some(database) = file.load::<Self>()? {
            tracing::info!("loaded {} users from {}", database.users.len(), file.path().display());
            return Ok(database);
        }

        let database = Self::defaults()?;
        file.persist(&database, None)?;
        tracing::info!("seeded {} with default users", file.path().display());
        Ok(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn seeds_hashed_defaults_once() {
        let dir = TempDir::new().unwrap();
        let file = JsonFile::new(dir.path().join("users.json"));

        let seeded = StaticUserDatabase::load_or_seed(&file).unwrap();
        assert_eq!(seeded.users.len(), DEFAULT_USERS.len());

        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert!(!raw.contains("john123"), "passwords must not be stored in plaintext");

        let reloaded = StaticUserDatabase::load_or_seed(&file).unwrap();
        assert_eq!(reloaded.users["john"].password, seeded.users["john"].password);
        assert!(PasswordHash::decode(&reloaded.users["john"].password)
            .unwrap()
            .verify("john123"));
    }

    #[test]
    fn reads_hand_written_directories() {
        let dir = TempDir::new().unwrap();
        let file = JsonFile::new(dir.path().join("users.json"));
        std::fs::write(
            file.path(),
            r#"{"dave": {"password": "dave123", "role": "user", "name": "Dave"}}"#,
        )
        .unwrap();

        let database = StaticUserDatabase::load_or_seed(&file).unwrap();
        assert_eq!(database.users.len(), 1);
        assert_eq!(database.users["dave"].role, Role::User);
    }
}
