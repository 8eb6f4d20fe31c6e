//! Request/Response DTOs for the auth API

use authgate_db::Account;
use serde::{Deserialize, Serialize};

// ==================== Account Types ====================

/// Registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Account response (without password)
#[derive(Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            is_active: account.is_active,
            is_admin: account.is_admin,
            created_at: account.created_at.to_rfc3339(),
            last_login: account.last_login.map(|at| at.to_rfc3339()),
        }
    }
}

// ==================== Session Types ====================

/// OAuth2 password-grant form; the email travels as `username`
#[derive(Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

/// Issued token
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Token verification result
#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user_id: i64,
}

// ==================== Password Types ====================

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Plain acknowledgement
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
