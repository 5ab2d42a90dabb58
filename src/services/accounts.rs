use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{Profile, Role, User};
use crate::services::access::AdminAccess;
use crate::services::auth::{hash_password, verify_password, TokenService};

pub const MIN_PASSWORD_LENGTH: u64 = 8;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(email(message = "a valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    pub phone_number: Option<String>,
}

/// Account created by an administrator, with an explicit role.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(flatten)]
    #[validate(nested)]
    pub registration: Registration,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    #[validate(length(min = 1, message = "full name cannot be empty"))]
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// A registration whose password has been replaced by its bcrypt hash.
/// Building one is the slow part of sign-up and needs no connection.
#[derive(Debug, Clone)]
pub struct HashedRegistration {
    email: String,
    full_name: String,
    phone_number: Option<String>,
    password_hash: String,
}

impl Registration {
    pub fn into_hashed(self, bcrypt_cost: u32) -> AppResult<HashedRegistration> {
        Ok(HashedRegistration {
            password_hash: hash_password(&self.password, bcrypt_cost)?,
            email: self.email,
            full_name: self.full_name,
            phone_number: self.phone_number,
        })
    }
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

fn create_account(
    conn: &Connection,
    registration: HashedRegistration,
    role: Role,
) -> AppResult<User> {
    let email = registration.email.trim().to_lowercase();
    let full_name = registration.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(AppError::InvalidArgument("full name is required".to_string()));
    }

    if queries::email_exists(conn, &email)? {
        return Err(AppError::Conflict("email already registered".to_string()));
    }

    let phone_number = normalize_phone(registration.phone_number);
    if let Some(phone) = &phone_number {
        if queries::phone_taken(conn, phone, None)? {
            return Err(AppError::Conflict("phone number already registered".to_string()));
        }
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash: registration.password_hash,
        full_name,
        phone_number,
        role,
        active: true,
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_user(conn, &user)?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "account created");
    Ok(user)
}

fn login_response(tokens: &TokenService, user: &User) -> AppResult<LoginResponse> {
    Ok(LoginResponse {
        token: tokens.issue(user)?,
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role: user.role,
    })
}

/// Self-service sign-up. Always yields a CUSTOMER.
pub fn register(
    conn: &Connection,
    tokens: &TokenService,
    registration: HashedRegistration,
) -> AppResult<LoginResponse> {
    let user = create_account(conn, registration, Role::Customer)?;
    login_response(tokens, &user)
}

/// The account a login attempt names. Unknown and inactive accounts fail
/// exactly like a wrong password.
pub fn find_login_account(conn: &Connection, email: &str) -> AppResult<User> {
    match queries::get_user_by_email(conn, email.trim())? {
        Some(user) if user.active => Ok(user),
        Some(user) => {
            tracing::warn!(user_id = %user.id, "login rejected: account inactive");
            Err(AppError::InvalidCredentials)
        }
        None => Err(AppError::InvalidCredentials),
    }
}

/// Checks the password against an account from [`find_login_account`] and
/// issues a token.
pub fn authenticate(tokens: &TokenService, user: &User, password: &str) -> AppResult<LoginResponse> {
    if !verify_password(password, &user.password_hash) {
        tracing::warn!(user_id = %user.id, "login rejected");
        return Err(AppError::InvalidCredentials);
    }
    login_response(tokens, user)
}

pub fn update_profile(conn: &Connection, user: &User, changes: ProfileChanges) -> AppResult<Profile> {
    let full_name = match changes.full_name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::InvalidArgument("full name cannot be empty".to_string()))
        }
        Some(name) => name.trim().to_string(),
        None => user.full_name.clone(),
    };

    let phone_number = match changes.phone_number {
        Some(raw) => normalize_phone(Some(raw)),
        None => user.phone_number.clone(),
    };
    if let Some(phone) = &phone_number {
        if queries::phone_taken(conn, phone, Some(&user.id))? {
            return Err(AppError::Conflict("phone number already registered".to_string()));
        }
    }

    queries::update_user_profile(conn, &user.id, &full_name, phone_number.as_deref())?;

    let updated = queries::get_user_by_id(conn, &user.id)?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    Ok(Profile::from(&updated))
}

/// Verifies the old password and hashes the new one. Returns the hash to
/// store with [`store_password`].
pub fn hash_password_change(
    user: &User,
    change: &PasswordChange,
    bcrypt_cost: u32,
) -> AppResult<String> {
    if !verify_password(&change.old_password, &user.password_hash) {
        return Err(AppError::InvalidArgument("old password is incorrect".to_string()));
    }
    if (change.new_password.chars().count() as u64) < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidArgument(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    hash_password(&change.new_password, bcrypt_cost)
}

pub fn store_password(conn: &Connection, user: &User, password_hash: &str) -> AppResult<()> {
    if !queries::update_password_hash(conn, &user.id, password_hash)? {
        return Err(AppError::NotFound("user not found".to_string()));
    }
    tracing::info!(user_id = %user.id, "password changed");
    Ok(())
}

pub fn create_managed_account(
    conn: &Connection,
    access: &AdminAccess,
    role: Role,
    registration: HashedRegistration,
) -> AppResult<Profile> {
    check_managed_role(role)?;
    let user = create_account(conn, registration, role)?;
    tracing::info!(user_id = %user.id, admin_id = %access.admin_id(), "managed account created");
    Ok(Profile::from(&user))
}

/// Admins hand out STAFF and ADMIN accounts; customers sign up themselves.
pub fn check_managed_role(role: Role) -> AppResult<()> {
    if role == Role::Customer {
        return Err(AppError::InvalidArgument(
            "customers register themselves".to_string(),
        ));
    }
    Ok(())
}

pub fn list_staff(conn: &Connection, _access: &AdminAccess) -> AppResult<Vec<Profile>> {
    Ok(queries::list_users_by_role(conn, Role::Staff)?
        .iter()
        .map(Profile::from)
        .collect())
}

/// Seeds the configured administrator on first start. Returns whether an
/// account was created.
pub fn ensure_admin(
    conn: &Connection,
    email: &str,
    password: &str,
    bcrypt_cost: u32,
) -> AppResult<bool> {
    if queries::email_exists(conn, email.trim())? {
        return Ok(false);
    }

    let registration = Registration {
        email: email.to_string(),
        password: password.to_string(),
        full_name: "Administrator".to_string(),
        phone_number: None,
    };
    registration
        .validate()
        .map_err(|e| AppError::Config(format!("bootstrap admin is invalid: {e}")))?;

    create_account(conn, registration.into_hashed(bcrypt_cost)?, Role::Admin)?;
    Ok(true)
}
