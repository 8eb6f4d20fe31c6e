//! Session authority
//!
//! Orchestrates the credential hasher, password policy, token codec and the
//! two stores into the account and session lifecycle: registration, login,
//! token validation, logout, password change and password reset requests.

use authgate_db::{Account, AccountPatch, NewAccount};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::jwt::{SessionToken, TokenCodec, TokenConfig};
use crate::password::CredentialHasher;
use crate::policy::validate_password;
use crate::store::{AccountStore, RevocationStore, StoreError};

/// Maximum allowed email length
pub const MAX_EMAIL_LENGTH: usize = 255;
/// Maximum allowed password length (prevent DoS with very large passwords)
pub const MAX_PASSWORD_LENGTH: usize = 256;

/// Issues, validates and revokes session tokens
pub struct SessionAuthority {
    codec: TokenCodec,
    hasher: CredentialHasher,
    accounts: Arc<dyn AccountStore>,
    revocations: Arc<dyn RevocationStore>,
}

impl SessionAuthority {
    pub fn new(
        config: &TokenConfig,
        hasher: CredentialHasher,
        accounts: Arc<dyn AccountStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            codec: TokenCodec::new(config),
            hasher,
            accounts,
            revocations,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create an active, non-admin account
    pub async fn register(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        validate_email(email)?;
        check_password_length(password)?;
        if let Some(violation) = validate_password(password) {
            debug!("Registration for {} rejected: {}", email, violation);
            return Err(AuthError::WeakPassword(violation));
        }

        if self.accounts.find_account_by_email(email).await?.is_some() {
            debug!("Registration for {} rejected: email taken", email);
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;

        // A concurrent registration may win between the lookup and here; the
        // store's uniqueness check turns that into AlreadyExists.
        let account = self
            .accounts
            .insert_account(NewAccount {
                email: email.to_string(),
                password_hash,
                is_active: true,
                is_admin: false,
            })
            .await?;

        info!("Registered account {} ({})", account.id, account.email);
        Ok(account)
    }

    /// Check credentials and issue a token with the default lifetime
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionToken, AuthError> {
        self.authenticate_with_ttl(email, password, self.codec.default_ttl())
            .await
    }

    /// Check credentials and issue a token living for `ttl`
    pub async fn authenticate_with_ttl(
        &self,
        email: &str,
        password: &str,
        ttl: Duration,
    ) -> Result<SessionToken, AuthError> {
        check_password_length(password)?;

        let account = self.accounts.find_account_by_email(email).await?;

        // Always run one verification so unknown emails cost the same
        let account = match account {
            Some(account) if self.hasher.verify(password, &account.password_hash) => account,
            Some(account) => {
                warn!("Failed login for account {}: wrong password", account.id);
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                self.hasher.verify_placeholder(password);
                warn!("Failed login for {}: no such account", email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !account.is_active {
            warn!("Failed login for account {}: inactive", account.id);
            return Err(AuthError::InactiveAccount);
        }

        let session = self.codec.issue(&account.email, account.id, ttl)?;

        let now = Utc::now();
        self.accounts
            .update_account_fields(account.id, AccountPatch::last_login(now))
            .await?;

        info!("Account {} logged in", account.id);
        Ok(session)
    }

    /// Resolve a bearer token to its account
    ///
    /// Signature and expiry are checked before any store lookup.
    pub async fn validate(&self, token: &str) -> Result<Account, AuthError> {
        let claims = self.codec.decode(token).map_err(|e| {
            debug!("Token rejected: {}", e);
            AuthError::Unauthenticated
        })?;

        if claims.is_expired_at(Utc::now()) {
            debug!("Token rejected: expired for account {}", claims.user_id);
            return Err(AuthError::Expired);
        }

        if self.revocations.contains(token).await? {
            debug!("Token rejected: revoked for account {}", claims.user_id);
            return Err(AuthError::Revoked);
        }

        let account = self
            .accounts
            .find_account_by_email(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!("Token rejected: subject {} has no account", claims.sub);
                AuthError::Unauthenticated
            })?;

        if account.id != claims.user_id {
            warn!(
                "Token rejected: subject {} is account {}, token names {}",
                claims.sub, account.id, claims.user_id
            );
            return Err(AuthError::Unauthenticated);
        }

        if !account.is_active {
            debug!("Token rejected: account {} inactive", account.id);
            return Err(AuthError::InactiveAccount);
        }

        Ok(account)
    }

    /// Revoke a token until its natural expiry
    ///
    /// Revoking an already revoked, expired or undecodable token is a no-op.
    pub async fn logout(&self, token: &str, account_id: i64) -> Result<(), AuthError> {
        let claims = match self.codec.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Logout ignored: {}", e);
                return Ok(());
            }
        };

        if claims.user_id != account_id {
            warn!(
                "Logout rejected: token belongs to account {}, not {}",
                claims.user_id, account_id
            );
            return Err(AuthError::Unauthenticated);
        }

        let Some(expires_at) = claims.expires_at() else {
            return Ok(());
        };
        if expires_at <= Utc::now() {
            debug!("Logout ignored: token already expired");
            return Ok(());
        }

        match self.revocations.add(token, account_id, expires_at).await {
            Ok(()) => info!("Revoked token for account {}", account_id),
            Err(StoreError::Duplicate(_)) => debug!("Token for account {} already revoked", account_id),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Replace an account's password
    ///
    /// Tokens issued before the change stay valid until they expire or are
    /// logged out.
    pub async fn change_password(
        &self,
        account: &Account,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !self.hasher.verify(current_password, &account.password_hash) {
            warn!("Password change for account {} rejected: wrong password", account.id);
            return Err(AuthError::IncorrectPassword);
        }

        check_password_length(new_password)?;
        if let Some(violation) = validate_password(new_password) {
            return Err(AuthError::WeakPassword(violation));
        }

        let password_hash = self.hasher.hash(new_password)?;
        let updated = self
            .accounts
            .update_account_fields(account.id, AccountPatch::password_hash(password_hash))
            .await?;
        if !updated {
            warn!("Password change for account {} failed: account gone", account.id);
            return Err(AuthError::Unauthenticated);
        }

        info!("Password changed for account {}", account.id);
        Ok(())
    }

    /// Accept a password reset request
    ///
    /// The outcome is identical whether or not the email is registered.
    pub async fn request_password_reset(&self, email: &str) {
        match self.accounts.find_account_by_email(email).await {
            Ok(Some(account)) => info!("Password reset requested for account {}", account.id),
            Ok(None) => debug!("Password reset requested for unknown email"),
            Err(e) => warn!("Password reset lookup failed: {}", e),
        }
    }
}

/// Basic shape check for an email address
fn validate_email(email: &str) -> Result<(), AuthError> {
    let malformed = || AuthError::MalformedInput("Invalid email address".to_string());

    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(malformed());
    }
    if email.chars().any(char::is_whitespace) {
        return Err(malformed());
    }

    let (local, domain) = email.split_once('@').ok_or_else(malformed)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(malformed());
    }
    Ok(())
}

fn check_password_length(password: &str) -> Result<(), AuthError> {
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::MalformedInput(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
