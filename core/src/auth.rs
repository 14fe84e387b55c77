//! Username/password gate in front of the calculator.
//!
//! Passwords are compared as HMAC-SHA256 tags keyed by the username,
//! so the final comparison is constant-time (`Mac::verify_slice`).

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize)]
struct SecretsFile {
    passwords: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct Credentials {
    passwords: HashMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("users", &self.passwords.len())
            .finish()
    }
}

impl Credentials {
    /// Load `{data_dir}/secrets.json`: `{"passwords": {"user": "pw"}}`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/secrets.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: SecretsFile = serde_json::from_str(&content)?;
        Ok(Self { passwords: file.passwords })
    }

    pub fn from_map(passwords: HashMap<String, String>) -> Self {
        Self { passwords }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let Some(expected) = self.passwords.get(username) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(username.as_bytes()) else {
            return false;
        };
        mac.update(expected.as_bytes());
        let expected_tag = mac.finalize().into_bytes();

        let Ok(mut mac) = HmacSha256::new_from_slice(username.as_bytes()) else {
            return false;
        };
        mac.update(password.as_bytes());
        mac.verify_slice(&expected_tag).is_ok()
    }
}
