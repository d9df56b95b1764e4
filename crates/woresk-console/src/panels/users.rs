//! User roles panel (`/user_roles`)

use super::{Editable, Panel, Resource};
use validator::Validate;
use woresk_core::types::{UserRole, UserRoleForm};
use woresk_core::{Error, Result};

impl Resource for UserRole {
    type Id = i64;
    const COLLECTION: &'static str = "user_roles";
    const LABEL: &'static str = "user";

    fn id(&self) -> &i64 {
        &self.id
    }
}

impl Editable for UserRole {
    type Form = UserRoleForm;

    fn check_form(form: &UserRoleForm, creating: bool) -> Result<()> {
        form.validate()?;
        if creating && form.password.trim().is_empty() {
            return Err(Error::validation("password", "password is required"));
        }
        Ok(())
    }
}

/// Panel listing managed users
pub type UsersPanel = Panel<UserRole>;

/// Edit form pre-filled from `user`; the password stays blank so the
/// backend keeps the existing one
#[must_use]
pub fn edit_form(user: &UserRole) -> UserRoleForm {
    UserRoleForm {
        username: user.username.clone(),
        password: String::new(),
        ip_address: user.ip_address.clone(),
        role_name: user.role_name,
    }
}
