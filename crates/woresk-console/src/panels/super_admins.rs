//! Super-admin accounts panel (`/super_admins`)

use super::{Editable, Panel, Resource};
use validator::Validate;
use woresk_core::types::{SuperAdmin, SuperAdminForm};
use woresk_core::{Error, Result};

/// Minimum password length for new super-admins
pub const MIN_PASSWORD_LEN: usize = 8;

impl Resource for SuperAdmin {
    type Id = i64;
    const COLLECTION: &'static str = "super_admins";
    const LABEL: &'static str = "super-admin";

    fn id(&self) -> &i64 {
        &self.id
    }
}

impl Editable for SuperAdmin {
    type Form = SuperAdminForm;

    fn check_form(form: &SuperAdminForm, creating: bool) -> Result<()> {
        form.validate()?;
        let password = form.password.trim();
        if creating && password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(
                "password",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if !creating && !password.is_empty() && password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(
                "password",
                format!("new password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        Ok(())
    }
}

/// Panel listing super-admin accounts
pub type SuperAdminsPanel = Panel<SuperAdmin>;

/// Edit form pre-filled from `admin`, password left blank
#[must_use]
pub fn edit_form(admin: &SuperAdmin) -> SuperAdminForm {
    SuperAdminForm {
        username: admin.username.clone(),
        password: String::new(),
        ip_address: admin.ip_address.clone(),
    }
}
