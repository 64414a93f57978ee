use attendance_protocol::{Identity, UserProfile};

use std::collections::BTreeMap;

use super::*;
use crate::static_data::{DirectoryError, StaticUserDatabase};

/// Naive implementation of `UserManaging`, everything lives in memory
#[derive(Debug, Default)]
pub struct NaiveUserManager {
    users: BTreeMap<UserId, User>,
}

impl NaiveUserManager {
    /// Only the built in default users
    pub fn naive() -> Result<Self, DirectoryError> {
        Self::from_database(StaticUserDatabase::defaults()?)
    }

    pub fn from_database(database: StaticUserDatabase) -> Result<Self, DirectoryError> {
        let users = database
            .users
            .into_iter()
            .map(|(username, stored)| {
                let password = match PasswordHash::decode(&stored.password) {
                    Some(hash) => hash,
                    None => {
                        tracing::warn!("{:?} has a plaintext password, hashing it in memory", username);
                        PasswordHash::new(&stored.password).map_err(|source| DirectoryError::Hash {
                            username: username.clone(),
                            source,
                        })?
                    }
                };
                let user = User {
                    username: username.clone(),
                    password,
                    role: stored.role,
                    name: stored.name,
                };
                Ok((username, user))
            })
            .collect::<Result<BTreeMap<_, _>, DirectoryError>>()?;

        tracing::debug!("new NaiveUserManager with {} users", users.len());
        Ok(NaiveUserManager { users })
    }
}

impl UserManaging for NaiveUserManager {
    fn who_is(&self, user_id: &str) -> Option<Identity> {
        let user = self.users.get(user_id);
        if user.is_none() {
            tracing::debug!("no such user {:?}", user_id);
        }
        user.map(User::identity)
    }

    fn credential(&self, user_id: &str) -> Option<&PasswordHash> {
        self.users.get(user_id).map(|user| &user.password)
    }

    fn profiles(&self) -> BTreeMap<UserId, UserProfile> {
        self.users
            .iter()
            .map(|(username, user)| (username.clone(), user.profile()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_protocol::Role;

    #[test]
    fn knows_the_default_users() {
        let manager = NaiveUserManager::naive().unwrap();
        let profiles = manager.profiles();

        assert_eq!(
            profiles.keys().map(String::as_str).collect::<Vec<_>>(),
            ["admin", "alice", "bob", "jane", "john"]
        );
        assert_eq!(profiles["admin"].role, Role::Admin);
        assert_eq!(profiles["alice"].name, "Alice Williams");
        assert!(manager.who_is("nobody").is_none());
    }

    #[test]
    fn plaintext_entries_get_hashed() {
        let mut database = StaticUserDatabase::default();
        database.users.insert(
            "carol".into(),
            StoredUser {
                password: "carol123".into(),
                role: Role::User,
                name: "Carol".into(),
            },
        );

        let manager = NaiveUserManager::from_database(database).unwrap();
        let credential = manager.credential("carol").unwrap();
        assert!(credential.verify("carol123"));
        assert!(credential.encode().starts_with("$2b$"));
    }
}
