//! Application users

use std::fmt;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::impl_fields;
use super::impl_value_from_enum;
use super::logged;
use crate::BizdeskClient;
use crate::api::AuthUser;
use crate::api::TableRecord;
use crate::api::query::Filter;
use crate::api::query::OrderBy;
use crate::api::query::Query;
use crate::error::Error;
use crate::error::ValidationErrors;
use crate::retry::RetryConfig;
use crate::retry::with_retry;
use crate::validation;

/// Attempts made by [`Users::list`].
pub const LIST_ATTEMPTS: u32 = 3;

/// Delay between [`Users::list`] attempts.
pub const LIST_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Admin,
    Manager,
    #[default]
    Staff,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Staff => "staff",
        }
    }

    /// Users with a protected role cannot be deleted.
    pub fn is_protected(self) -> bool {
        matches!(self, UserRole::Owner | UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl_value_from_enum!(UserRole);

/// An `app_users` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn active_by_default() -> bool {
    true
}

impl TableRecord for AppUser {
    const TABLE: &'static str = "app_users";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl_fields!(AppUser {
    id,
    email,
    full_name,
    role,
    department,
    phone,
    is_active,
    last_login_at,
    created_at,
});

/// The signed-in user with their application profile, when one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub auth: AuthUser,
    pub profile: Option<AppUser>,
}

impl CurrentUser {
    pub fn role(&self) -> Option<UserRole> {
        self.profile.as_ref().map(|p| p.role)
    }
}

/// Input for [`Users::create`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub phone: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::check_email(&mut errors, "email", &self.email);
        validation::require_text(&mut errors, "full_name", Some(self.full_name.as_str()));
        errors.into_result()
    }
}

/// Changes for [`Users::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(email) = &self.email {
            validation::check_email(&mut errors, "email", email);
        }
        if let Some(name) = &self.full_name {
            validation::require_text(&mut errors, "full_name", Some(name.as_str()));
        }
        errors.into_result()
    }
}

/// Emails are stored trimmed and lowercased.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn duplicate_email(email: &str) -> Error {
    Error::business(format!("A user with the email {email} already exists"))
}

/// User operations.
pub struct Users<'a> {
    client: &'a BizdeskClient,
}

impl<'a> Users<'a> {
    pub(crate) fn new(client: &'a BizdeskClient) -> Self {
        Self { client }
    }

    /// All users ordered by name, retried with a fixed delay on transient
    /// failures.
    pub async fn list(&self) -> Result<Vec<AppUser>, Error> {
        let retry = RetryConfig::fixed(LIST_ATTEMPTS, LIST_RETRY_DELAY);
        let query = Query::new().order(OrderBy::asc("full_name"));
        logged(
            "list users",
            with_retry(&retry, "list users", || self.client.list::<AppUser>(&query)).await,
        )
    }

    pub async fn get(&self, id: Uuid) -> Result<AppUser, Error> {
        logged("get user", self.client.get_by_id::<AppUser>(id).await)
    }

    async fn find_by_email(&self, email: &str, excluding: Option<Uuid>) -> Result<Option<AppUser>, Error> {
        let mut query = Query::new().filter(Filter::eq("email", email)).limit(1);
        if let Some(id) = excluding {
            query = query.filter(Filter::neq("id", id));
        }
        Ok(self.client.list::<AppUser>(&query).await?.into_iter().next())
    }

    /// Creates a user, rejecting an email that is already taken.
    pub async fn create(&self, new: &NewUser) -> Result<AppUser, Error> {
        new.validate()?;

        let email = normalize_email(&new.email);
        if logged("check email", self.find_by_email(&email, None).await)?.is_some() {
            return Err(duplicate_email(&email));
        }

        let row = NewUser {
            email: email.clone(),
            full_name: new.full_name.trim().to_string(),
            department: validation::non_blank(new.department.as_deref()).map(str::to_string),
            phone: validation::non_blank(new.phone.as_deref()).map(str::to_string),
            role: new.role,
        };
        match self.client.insert::<AppUser, _>(&row).await {
            Err(e) if e.is_unique_violation() => Err(duplicate_email(&email)),
            result => logged("create user", result),
        }
    }

    pub async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<AppUser, Error> {
        patch.validate()?;

        let mut patch = patch.clone();
        if let Some(email) = &patch.email {
            let email = normalize_email(email);
            if logged("check email", self.find_by_email(&email, Some(id)).await)?.is_some() {
                return Err(duplicate_email(&email));
            }
            patch.email = Some(email);
        }

        match self.client.update::<AppUser, _>(id, &patch).await {
            Err(e) if e.is_unique_violation() => Err(duplicate_email(patch.email.as_deref().unwrap_or_default())),
            result => logged("update user", result),
        }
    }

    /// Deletes a user unless their role is protected.
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let user = self.get(id).await?;
        if user.role.is_protected() {
            return Err(Error::business(format!(
                "Cannot delete {}: users with the {} role are protected",
                user.full_name, user.role
            )));
        }
        logged("delete user", self.client.delete::<AppUser>(id).await)
    }

    /// The signed-in user and their profile row.
    ///
    /// The profile is matched by id first, then by email.
    pub async fn current_user(&self) -> Result<CurrentUser, Error> {
        let auth = logged("get current user", self.client.current_user().await)?;

        let by_id = Query::new().filter(Filter::eq("id", auth.id)).limit(1);
        let mut profile = self.client.list::<AppUser>(&by_id).await?.into_iter().next();
        if profile.is_none() {
            if let Some(email) = &auth.email {
                profile = self.find_by_email(&normalize_email(email), None).await?;
            }
        }

        Ok(CurrentUser { auth, profile })
    }

    /// Changes the signed-in user's password.
    pub async fn update_password(&self, new_password: &str) -> Result<(), Error> {
        logged("update password", self.client.update_password(new_password).await).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::codes;

    #[test]
    fn test_protected_roles() {
        assert!(UserRole::Owner.is_protected());
        assert!(UserRole::Admin.is_protected());
        assert!(!UserRole::Manager.is_protected());
        assert!(!UserRole::Staff.is_protected());
    }

    #[test]
    fn test_new_user_validation() {
        let user = NewUser {
            email: "not-an-email".into(),
            ..NewUser::default()
        };
        let err = user.validate().unwrap_err();
        assert!(err.has_code("email", codes::INVALID_EMAIL));
        assert!(err.has_code("full_name", codes::REQUIRED));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_user_defaults() {
        let user: AppUser = serde_json::from_value(serde_json::json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "email": "ada@example.com",
            "full_name": "Ada"
        }))
        .unwrap();
        assert!(user.is_active);
        assert_eq!(user.role, UserRole::Staff);
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = UserPatch {
            role: Some(UserRole::Manager),
            ..UserPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "role": "manager" })
        );
    }
}
