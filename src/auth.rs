use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::config::RemoteConfig;
use crate::db::Database;
use crate::error::AuthError;

const SESSION_KEY: &str = "loggedInUser";
const ACCOUNTS_KEY: &str = "users";
// Refresh a little before the server-side expiry.
const TOKEN_SKEW_SECS: i64 = 60;

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[._-]+").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tokens {
    pub id_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl Tokens {
    pub fn is_expired(&self, now: i64) -> bool {
        now + TOKEN_SKEW_SECS >= self.expires_at
    }
}

/// The signed-in user. `uid` and `tokens` are only present for cloud
/// accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Tokens>,
}

impl User {
    pub fn display_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.trim().to_string();
        }
        derive_name_from_email(&self.email)
    }
}

/// "jane.doe_smith@x.com" becomes "Jane Doe Smith".
pub fn derive_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    NAME_SEPARATORS
        .replace_all(local, " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_credentials(email: &str, password: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(email)
}

// --- Session persistence ---

pub fn load_user(db: &Database) -> Option<User> {
    let raw = match db.get(SESSION_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read saved session");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable saved session");
            None
        }
    }
}

pub fn save_user(db: &Database, user: &User) -> Result<(), AuthError> {
    db.set(SESSION_KEY, &serde_json::to_string(user)?)?;
    Ok(())
}

pub fn clear_user(db: &Database) -> Result<(), AuthError> {
    db.remove(SESSION_KEY)?;
    Ok(())
}

// --- Authenticators ---

pub trait Authenticator {
    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Returns the user when registering also signs them in.
    fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<User>, AuthError>;

    fn update_display_name(&self, user: &User, name: &str) -> Result<User, AuthError>;

    fn sign_out(&self, _user: &User) -> Result<(), AuthError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalAccount {
    password_hash: String,
    #[serde(default)]
    name: String,
}

/// Accounts kept next to the records in the local store. Meant for a single
/// machine; nothing here is shared.
pub struct LocalAccounts<'a> {
    db: &'a Database,
}

impl<'a> LocalAccounts<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn accounts(&self) -> Result<BTreeMap<String, LocalAccount>, AuthError> {
        match self.db.get(ACCOUNTS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BTreeMap::new()),
        }
    }

    fn save_accounts(&self, accounts: &BTreeMap<String, LocalAccount>) -> Result<(), AuthError> {
        self.db.set(ACCOUNTS_KEY, &serde_json::to_string(accounts)?)?;
        Ok(())
    }
}

fn password_hash(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Authenticator for LocalAccounts<'_> {
    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = require_credentials(email, password)?;
        let accounts = self.accounts()?;
        let account = accounts
            .get(&email)
            .filter(|a| a.password_hash == password_hash(&email, password))
            .ok_or(AuthError::InvalidCredentials)?;
        Ok(User {
            name: account.name.clone(),
            email,
            uid: None,
            tokens: None,
        })
    }

    fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<User>, AuthError> {
        let email = require_credentials(email, password)?;
        let mut accounts = self.accounts()?;
        if accounts.contains_key(&email) {
            return Err(AuthError::AlreadyExists(email));
        }
        accounts.insert(
            email.clone(),
            LocalAccount {
                password_hash: password_hash(&email, password),
                name: name.trim().to_string(),
            },
        );
        self.save_accounts(&accounts)?;
        tracing::info!(email = %email, "local account created");
        Ok(None)
    }

    fn update_display_name(&self, user: &User, name: &str) -> Result<User, AuthError> {
        let mut accounts = self.accounts()?;
        if let Some(account) = accounts.get_mut(&user.email) {
            account.name = name.trim().to_string();
            self.save_accounts(&accounts)?;
        }
        Ok(User {
            name: name.trim().to_string(),
            ..user.clone()
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Authentication over the Identity Toolkit REST API.
#[derive(Debug)]
pub struct FirebaseAuth {
    client: reqwest::blocking::Client,
    api_key: String,
    auth_url: String,
    token_url: String,
}

impl FirebaseAuth {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key: config.api_key.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
        }
    }

    fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        body: serde_json::Value,
    ) -> Result<T, AuthError> {
        let response = self
            .client
            .post(format!("{}/v1/accounts:{}", self.auth_url, action))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()?;
        read_response(response)
    }

    /// Exchanges the refresh token for a fresh id token.
    pub fn refresh(&self, user: &User, now: i64) -> Result<User, AuthError> {
        let tokens = user.tokens.as_ref().ok_or(AuthError::NotSignedIn)?;
        let response = self
            .client
            .post(format!("{}/v1/token", self.token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", tokens.refresh_token.as_str()),
            ])
            .send()?;
        let refreshed: RefreshResponse = read_response(response)?;
        tracing::debug!(uid = %refreshed.user_id, "id token refreshed");
        Ok(User {
            uid: Some(refreshed.user_id),
            tokens: Some(Tokens {
                id_token: refreshed.id_token,
                refresh_token: refreshed.refresh_token,
                expires_at: now + refreshed.expires_in.parse::<i64>().unwrap_or(3600),
            }),
            ..user.clone()
        })
    }

    fn user_from(&self, response: IdentityResponse, fallback_email: &str, now: i64) -> User {
        let tokens = match (response.id_token, response.refresh_token) {
            (Some(id_token), Some(refresh_token)) => Some(Tokens {
                id_token,
                refresh_token,
                expires_at: now
                    + response
                        .expires_in
                        .as_deref()
                        .and_then(|s| s.parse::<i64>().ok())
                        .unwrap_or(3600),
            }),
            _ => None,
        };
        User {
            email: response.email.unwrap_or_else(|| fallback_email.to_string()),
            uid: Some(response.local_id),
            name: response.display_name.unwrap_or_default(),
            tokens,
        }
    }
}

fn read_response<T: serde::de::DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, AuthError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {}", status));
        return Err(match message.as_str() {
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                AuthError::InvalidCredentials
            }
            _ if message.starts_with("EMAIL_EXISTS") => AuthError::AlreadyExists(message),
            _ => AuthError::Rejected(message),
        });
    }
    Ok(response.json()?)
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Authenticator for FirebaseAuth {
    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = require_credentials(email, password)?;
        let response: IdentityResponse = self.call(
            "signInWithPassword",
            serde_json::json!({ "email": email, "password": password, "returnSecureToken": true }),
        )?;
        Ok(self.user_from(response, &email, unix_now()))
    }

    fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<User>, AuthError> {
        let email = require_credentials(email, password)?;
        let response: IdentityResponse = self.call(
            "signUp",
            serde_json::json!({ "email": email, "password": password, "returnSecureToken": true }),
        )?;
        let user = self.user_from(response, &email, unix_now());
        if name.trim().is_empty() {
            return Ok(Some(user));
        }
        // The account exists at this point; a failed profile update is not fatal.
        match self.update_display_name(&user, name) {
            Ok(named) => Ok(Some(named)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to set display name after sign up");
                Ok(Some(user))
            }
        }
    }

    fn update_display_name(&self, user: &User, name: &str) -> Result<User, AuthError> {
        let tokens = user.tokens.as_ref().ok_or(AuthError::NotSignedIn)?;
        let _: IdentityResponse = self.call(
            "update",
            serde_json::json!({
                "idToken": tokens.id_token,
                "displayName": name.trim(),
                "returnSecureToken": false,
            }),
        )?;
        Ok(User {
            name: name.trim().to_string(),
            ..user.clone()
        })
    }
}
