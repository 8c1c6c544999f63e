//! Users, roles and role assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use seniorcare_core::{
    Audit, ColumnType, Constraint, DomainError, DomainResult, EntityId, FieldValue, GridColumn,
    GridView, Gridded, Operations, Projection, Record, Rule, SpaceId, UserId, Validate,
};

/// Application user.
///
/// # Invariants
/// - A disabled user cannot log in.
/// - Reaching the configured number of consecutive failed logins disables
///   the account; only [`User::unlock`] re-enables it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub space_id: SpaceId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    /// Password hash; never projected.
    pub password: String,
    pub enabled: bool,
    pub login_attempts: u32,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_recovery_hash: Option<String>,
    #[serde(default)]
    pub activation_hash: Option<String>,
    pub completed: bool,
    #[serde(flatten)]
    pub audit: Audit,
}

impl User {
    pub fn new(space_id: SpaceId, username: &str, email: &str) -> Self {
        Self {
            id: UserId::new(),
            space_id,
            first_name: String::new(),
            last_name: String::new(),
            username: username.to_string(),
            email: email.to_string(),
            password: String::new(),
            enabled: true,
            login_attempts: 0,
            last_activity_at: None,
            password_recovery_hash: None,
            activation_hash: None,
            completed: false,
            audit: Audit::default(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn can_log_in(&self) -> bool {
        self.enabled
    }

    /// Count a failed login. Returns `true` when this attempt locked the
    /// account.
    pub fn record_failed_login(&mut self, max_attempts: u32) -> bool {
        self.login_attempts = self.login_attempts.saturating_add(1);
        if self.enabled && self.login_attempts >= max_attempts {
            self.enabled = false;
            tracing::info!(user_id = %self.id, attempts = self.login_attempts, "account locked");
            return true;
        }
        false
    }

    /// Reset the failure counter on a successful login.
    pub fn record_successful_login(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.enabled {
            return Err(DomainError::invariant("user is disabled"));
        }
        self.login_attempts = 0;
        self.last_activity_at = Some(at);
        Ok(())
    }

    pub fn remaining_attempts(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.login_attempts)
    }

    /// Re-enable a locked account and clear the counter.
    pub fn unlock(&mut self) {
        self.enabled = true;
        self.login_attempts = 0;
    }

    /// Start a password recovery.
    pub fn begin_password_recovery(&mut self, hash: String) {
        self.password_recovery_hash = Some(hash);
    }

    /// Finish a password recovery with the hash sent to the user.
    pub fn complete_password_recovery(&mut self, hash: &str, new_password: String) -> DomainResult<()> {
        match self.password_recovery_hash.as_deref() {
            Some(expected) if expected == hash => {
                self.password = new_password;
                self.password_recovery_hash = None;
                self.unlock();
                Ok(())
            }
            _ => Err(DomainError::validation("invalid password recovery hash")),
        }
    }
}

impl seniorcare_core::Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for User {
    const TABLE: &'static str = "tbl_user";

    fn record_id(&self) -> EntityId {
        EntityId::from_uuid(*self.id.as_uuid())
    }

    fn record_space(&self) -> Option<SpaceId> {
        Some(self.space_id)
    }
}

impl_audited!(User);
impl_operations!(User, "api_admin_user_add", "api_admin_user_edit");

/// Group used by the self-service signup endpoint.
pub const USER_SIGNUP: &str = "api_account_signup";

impl Validate for User {
    fn rules() -> Vec<Rule> {
        const ALL: &[&str] = &["api_admin_user_add", "api_admin_user_edit", USER_SIGNUP];
        const CREATE: &[&str] = &["api_admin_user_add", USER_SIGNUP];
        vec![
            Rule::new("first_name", Constraint::NotBlank, ALL),
            Rule::new("first_name", Constraint::Length { min: None, max: Some(60) }, ALL),
            Rule::new("last_name", Constraint::NotBlank, ALL),
            Rule::new("last_name", Constraint::Length { min: None, max: Some(60) }, ALL),
            Rule::new("username", Constraint::NotBlank, CREATE),
            Rule::new("username", Constraint::Length { min: Some(3), max: Some(128) }, CREATE),
            Rule::new("username", Constraint::UniqueWith(&[]), CREATE),
            Rule::new("email", Constraint::NotBlank, ALL),
            Rule::new("email", Constraint::Email, ALL),
            Rule::new("email", Constraint::UniqueWith(&[]), ALL),
            Rule::new("password", Constraint::NotBlank, CREATE),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "space_id" => FieldValue::Uuid(*self.space_id.as_uuid()),
            "first_name" => (&self.first_name).into(),
            "last_name" => (&self.last_name).into(),
            "username" => (&self.username).into(),
            "email" => (&self.email).into(),
            "password" => (&self.password).into(),
            "enabled" => self.enabled.into(),
            "login_attempts" => FieldValue::Integer(i64::from(self.login_attempts)),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for User {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", User::TABLE, "u")
                .scoped("u", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("u.id"))
                .column(
                    GridColumn::new("full_name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("CONCAT(u.first_name, ' ', u.last_name)"),
                )
                .column(
                    GridColumn::new("username", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("u.username"),
                )
                .column(
                    GridColumn::new("email", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("u.email"),
                )
                .column(
                    GridColumn::new("enabled", ColumnType::Boolean)
                        .sortable()
                        .filterable()
                        .expr("u.enabled"),
                )
                .column(
                    GridColumn::new("last_activity_at", ColumnType::Date)
                        .sortable()
                        .filterable()
                        .expr("u.last_activity_at"),
                ),
        ]
    }
}

impl Projection for User {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        const LIST: &[&str] = &[
            "id",
            "first_name",
            "last_name",
            "username",
            "email",
            "enabled",
            "last_activity_at",
        ];
        const DETAIL: &[&str] = &[
            "id",
            "space_id",
            "first_name",
            "last_name",
            "username",
            "email",
            "enabled",
            "login_attempts",
            "last_activity_at",
            "completed",
        ];
        // Every group is whitelisted so the password hash never leaks.
        match group {
            "list" => Some(LIST),
            _ => Some(DETAIL),
        }
    }

    fn virtual_fields(&self, _group: &str) -> Vec<(&'static str, Value)> {
        vec![("full_name", json!(self.full_name()))]
    }
}

/// Named permission set within a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: EntityId,
    pub space_id: SpaceId,
    pub name: String,
    /// Assigned to new users of the space.
    pub is_default: bool,
    /// Grant tree keyed by permission name.
    #[serde(default)]
    pub grants: Value,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Role {
    pub fn new(space_id: SpaceId, name: &str) -> Self {
        Self {
            id: EntityId::new(),
            space_id,
            name: seniorcare_core::normalize_title(name),
            is_default: false,
            grants: json!({}),
            audit: Audit::default(),
        }
    }

    /// Whether the grant tree enables `permission` (`{"name": {"enabled": true}}`).
    pub fn is_granted(&self, permission: &str) -> bool {
        self.grants
            .get(permission)
            .and_then(|g| g.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl_record!(Role, "tbl_role", space: space_id, title: name);
impl_audited!(Role);
impl_operations!(Role, "api_admin_role_add", "api_admin_role_edit");

impl Validate for Role {
    fn rules() -> Vec<Rule> {
        const GROUPS: &[&str] = &["api_admin_role_add", "api_admin_role_edit"];
        vec![
            Rule::new("name", Constraint::NotBlank, GROUPS),
            Rule::new("name", Constraint::Length { min: None, max: Some(255) }, GROUPS),
            Rule::new("name", Constraint::UniqueWith(&["space_id"]), GROUPS),
        ]
    }

    fn field(&self, path: &str) -> FieldValue<'_> {
        match path {
            "id" => FieldValue::Uuid(*self.id.as_uuid()),
            "space_id" => FieldValue::Uuid(*self.space_id.as_uuid()),
            "name" => (&self.name).into(),
            "is_default" => self.is_default.into(),
            _ => FieldValue::Unknown,
        }
    }
}

impl Gridded for Role {
    fn grid_views() -> Vec<GridView> {
        vec![
            GridView::new("list", Role::TABLE, "ro")
                .scoped("ro", "space_id")
                .column(GridColumn::new("id", ColumnType::Id).expr("ro.id"))
                .column(
                    GridColumn::new("name", ColumnType::String)
                        .sortable()
                        .filterable()
                        .expr("ro.name"),
                )
                .column(
                    GridColumn::new("is_default", ColumnType::Boolean)
                        .sortable()
                        .filterable()
                        .expr("ro.is_default"),
                )
                .column(GridColumn::new("grants", ColumnType::JsonSorted).expr("ro.grants")),
        ]
    }
}

impl Projection for Role {
    fn projection_fields(group: &str) -> Option<&'static [&'static str]> {
        match group {
            "list" => Some(&["id", "name", "is_default"]),
            "detail" => Some(&["id", "space_id", "name", "is_default", "grants"]),
            _ => None,
        }
    }
}

/// User ↔ role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: EntityId,
    pub user_id: UserId,
    pub role_id: EntityId,
}

impl UserRole {
    pub fn new(user_id: UserId, role_id: EntityId) -> Self {
        Self {
            id: EntityId::new(),
            user_id,
            role_id,
        }
    }
}

impl_record!(UserRole, "tbl_user_role");

#[cfg(test)]
mod tests {
    use super::*;
    use seniorcare_core::validation::validate;

    fn user() -> User {
        let mut u = User::new(SpaceId::new(), "jdoe", "jdoe@example.org");
        u.first_name = "Jane".into();
        u.last_name = "Doe".into();
        u.password = "$argon2id$hash".into();
        u
    }

    #[test]
    fn account_locks_after_max_failed_attempts() {
        let mut u = user();
        assert!(!u.record_failed_login(3));
        assert!(!u.record_failed_login(3));
        assert_eq!(u.remaining_attempts(3), 1);
        assert!(u.record_failed_login(3));
        assert!(!u.can_log_in());

        // Further failures keep counting but do not re-lock.
        assert!(!u.record_failed_login(3));
        assert_eq!(u.login_attempts, 4);
    }

    #[test]
    fn successful_login_resets_counter() {
        let mut u = user();
        u.record_failed_login(5);
        let now = Utc::now();
        u.record_successful_login(now).unwrap();
        assert_eq!(u.login_attempts, 0);
        assert_eq!(u.last_activity_at, Some(now));
    }

    #[test]
    fn locked_user_cannot_log_in_until_unlocked() {
        let mut u = user();
        u.record_failed_login(1);
        assert!(u.record_successful_login(Utc::now()).is_err());
        u.unlock();
        assert!(u.record_successful_login(Utc::now()).is_ok());
    }

    #[test]
    fn password_recovery_requires_matching_hash() {
        let mut u = user();
        u.record_failed_login(1);
        u.begin_password_recovery("h1".into());
        assert!(u.complete_password_recovery("nope", "x".into()).is_err());
        u.complete_password_recovery("h1", "new-hash".into()).unwrap();
        assert_eq!(u.password, "new-hash");
        assert!(u.can_log_in());
        assert!(u.password_recovery_hash.is_none());
    }

    #[test]
    fn signup_requires_password_but_edit_does_not() {
        let mut u = user();
        u.password.clear();
        let errors = validate(&u, &[seniorcare_core::Group::from_static(USER_SIGNUP)]).unwrap_err();
        assert!(errors.contains("password"));
        assert!(validate(&u, &User::edit_groups()).is_ok());
    }

    #[test]
    fn projection_never_exposes_password() {
        let u = user();
        for group in ["list", "detail", "anything"] {
            let json = u.project(group);
            assert!(json.get("password").is_none(), "group {group}");
        }
        assert_eq!(u.project("list")["full_name"], "Jane Doe");
    }

    #[test]
    fn role_grants_lookup() {
        let mut role = Role::new(SpaceId::new(), "Nurse  Manager");
        assert_eq!(role.name, "Nurse Manager");
        role.grants = json!({ "persistence-resident": { "enabled": true } });
        assert!(role.is_granted("persistence-resident"));
        assert!(!role.is_granted("persistence-contract"));
    }
}
