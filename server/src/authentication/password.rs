use bcrypt::HashParts;

use std::fmt;

pub use bcrypt::BcryptError as HashError;

/// Work factor for freshly hashed passwords
#[cfg(not(test))]
const COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const COST: u32 = 4;

/// A bcrypt hash of a password, stored as the usual `$2b$<cost>$<salt><digest>` string.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash {
    encoded: String,
}

impl PasswordHash {
    /// Hashes with a fresh random salt.
    pub fn new(password: &str) -> Result<Self, HashError> {
        let encoded = bcrypt::hash(password, COST)?;
        Ok(Self { encoded })
    }

    pub fn verify(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.encoded).unwrap_or(false)
    }

    pub fn encode(&self) -> String {
        self.encoded.clone()
    }

    /// `None` if `encoded` is not a bcrypt hash.
    pub fn decode(encoded: &str) -> Option<Self> {
        encoded.parse::<HashParts>().ok()?;
        Some(Self {
            encoded: encoded.into(),
        })
    }

    fn cost(&self) -> Option<u32> {
        self.encoded.parse::<HashParts>().ok().map(|parts| parts.get_cost())
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash").field("cost", &self.cost()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_right_password() {
        let hash = PasswordHash::new("john123").unwrap();
        assert!(hash.verify("john123"));
        assert!(!hash.verify("john124"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn fresh_salts_differ() {
        assert_ne!(
            PasswordHash::new("same").unwrap().encode(),
            PasswordHash::new("same").unwrap().encode()
        );
    }

    #[test]
    fn encoding_survives_decoding() {
        let hash = PasswordHash::new("admin123").unwrap();
        let encoded = hash.encode();
        assert!(encoded.starts_with("$2b$04$"), "{encoded}");

        let decoded = PasswordHash::decode(&encoded).unwrap();
        assert_eq!(decoded, hash);
        assert!(decoded.verify("admin123"));
        assert_eq!(decoded.cost(), Some(COST));
    }

    #[test]
    fn plaintext_and_fast_digests_do_not_decode() {
        let sha256 = "sha256$pepper$0f6c2b3e5a1d4c7b8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d";
        for raw in ["admin123", "", "$2b$", sha256] {
            assert!(PasswordHash::decode(raw).is_none(), "{raw}");
        }
    }

    #[test]
    fn debug_hides_the_hash() {
        let hash = PasswordHash::new("secret").unwrap();
        let debug = format!("{hash:?}");
        assert!(!debug.contains(&hash.encode()[7..]), "{debug}");
    }
}
