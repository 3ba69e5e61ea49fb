use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

fn default_limit() -> usize {
    5
}

fn default_user_key() -> String {
    "defaultUser".to_string()
}

/// One shopping scenario: what to search, how much to spend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub query: String,

    /// Upper price for collected items
    pub max_price: f64,

    /// Number of items to add
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Budget the final cart total must stay within
    pub max_cart_total: f64,

    /// Key into the credentials file
    #[serde(default = "default_user_key")]
    pub user_key: String,
}

impl Scenario {
    /// Human readable label used in logs and reports
    pub fn label(&self) -> String {
        format!(
            "'{}' under {} (limit {}, budget {})",
            self.query, self.max_price, self.limit, self.max_cart_total
        )
    }

    /// Check value ranges serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if !(self.max_price > 0.0) {
            return Err(format!("maxPrice must be positive, got {}", self.max_price));
        }
        if self.limit == 0 {
            return Err("limit must be at least 1".to_string());
        }
        if !(self.max_cart_total > 0.0) {
            return Err(format!(
                "maxCartTotal must be positive, got {}",
                self.max_cart_total
            ));
        }
        Ok(())
    }
}

/// Sign-in credentials for one user key
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Credentials keyed by user key
pub type CredentialMap = HashMap<String, Credential>;
