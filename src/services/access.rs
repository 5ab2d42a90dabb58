//! Role checks, done once at the request boundary.
//!
//! Each check yields a capability value that the privileged operations take
//! as an argument. The fields are private, so the only way to hold one is to
//! have passed the check.

use crate::errors::{AppError, AppResult};
use crate::models::{Role, User};

/// Proof that the caller is a staff member.
#[derive(Debug)]
pub struct StaffAccess {
    staff_id: String,
}

impl StaffAccess {
    pub fn staff_id(&self) -> &str {
        &self.staff_id
    }
}

/// Proof that the caller is an administrator.
#[derive(Debug)]
pub struct AdminAccess {
    admin_id: String,
}

impl AdminAccess {
    pub fn admin_id(&self) -> &str {
        &self.admin_id
    }
}

/// Proof that the caller works at the car wash (staff or admin).
#[derive(Debug)]
pub struct BackOfficeAccess {
    user_id: String,
}

impl BackOfficeAccess {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

pub fn require_staff(user: &User) -> AppResult<StaffAccess> {
    match user.role {
        Role::Staff => Ok(StaffAccess {
            staff_id: user.id.clone(),
        }),
        _ => Err(AppError::Forbidden(
            "only staff can update booking status".to_string(),
        )),
    }
}

pub fn require_admin(user: &User) -> AppResult<AdminAccess> {
    match user.role {
        Role::Admin => Ok(AdminAccess {
            admin_id: user.id.clone(),
        }),
        _ => Err(AppError::Forbidden("admin access required".to_string())),
    }
}

pub fn require_back_office(user: &User) -> AppResult<BackOfficeAccess> {
    match user.role {
        Role::Staff | Role::Admin => Ok(BackOfficeAccess {
            user_id: user.id.clone(),
        }),
        Role::Customer => Err(AppError::Forbidden("staff or admin access required".to_string())),
    }
}
