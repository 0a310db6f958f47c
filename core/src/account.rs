use crate::fields::{non_blank, optional, Fields};
use crate::{RecordId, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role given to accounts created without one.
pub const DEFAULT_ROLE: &str = "user";

/// A principal's identity and credential material.
///
/// `password` holds whatever the auth service stored, which must already be a
/// hash. The account itself does not check this; the store does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Account {
    username: String,
    password: String,
    role: String,
}

impl Account {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        role: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Account {
            username: non_blank("username", username.into())?,
            password: non_blank("password", password.into())?,
            role: role_or_default(role),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Role changes are the only mutation an account sees. A blank role resets
    /// it to [`DEFAULT_ROLE`].
    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = role_or_default(Some(role.into()));
    }

    pub fn into_persisted(self, id: RecordId) -> PersistedAccount {
        PersistedAccount {
            username: self.username,
            password: self.password,
            role: self.role,
            id: Some(id),
        }
    }
}

fn role_or_default(role: Option<String>) -> String {
    optional(role).unwrap_or_else(|| DEFAULT_ROLE.to_string())
}

impl TryFrom<Value> for Account {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let f = Fields::of(&value)?;
        Account::new(f.text("username", &[])?, f.text("password", &[])?, f.opt_text("role", &[])?)
    }
}

/// An account as held by the store. `id` stays `None` until the store assigns
/// one and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct PersistedAccount {
    username: String,
    password: String,
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
}

impl PersistedAccount {
    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Same rule as [`Account::set_role`].
    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = role_or_default(Some(role.into()));
    }

    pub fn assign_id(&mut self, id: RecordId) -> Result<(), ValidationError> {
        if self.id.is_some() {
            return Err(ValidationError::Immutable("id"));
        }
        self.id = Some(id);
        Ok(())
    }

    /// The outward-facing view, without credential material.
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}

impl From<Account> for PersistedAccount {
    fn from(account: Account) -> Self {
        PersistedAccount {
            username: account.username,
            password: account.password,
            role: account.role,
            id: None,
        }
    }
}

impl TryFrom<Value> for PersistedAccount {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let f = Fields::of(&value)?;
        let id = match f.opt_text("id", &["_id"])? {
            Some(raw) => Some(RecordId::for_field("id", raw)?),
            None => None,
        };
        Ok(PersistedAccount {
            username: non_blank("username", f.text("username", &[])?)?,
            password: non_blank("password", f.text("password", &[])?)?,
            role: non_blank("role", f.text("role", &[])?)?,
            id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub username: String,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_defaults_to_user() {
        let a = Account::new("alice", "hash123", None).unwrap();
        assert_eq!(a.role(), "user");
        let a: Account = serde_json::from_value(json!({ "username": "bob", "password": "h" })).unwrap();
        assert_eq!(a.role(), DEFAULT_ROLE);
    }

    #[test]
    fn serializes_with_named_fields() {
        let a = Account::new("alice", "hash123", None).unwrap();
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            json!({ "username": "alice", "password": "hash123", "role": "user" })
        );
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let err = Account::try_from(json!({ "password": "h" })).unwrap_err();
        assert_eq!(err, ValidationError::Missing("username"));
        let err = Account::try_from(json!({ "username": "alice" })).unwrap_err();
        assert_eq!(err, ValidationError::Missing("password"));
        let err = Account::try_from(json!({ "username": "alice", "password": 42 })).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { field: "password", .. }));
        assert_eq!(Account::new("", "h", None), Err(ValidationError::Blank("username")));
    }

    #[test]
    fn deserialize_reports_validation_message() {
        let err = serde_json::from_value::<Account>(json!({ "username": "alice" })).unwrap_err();
        assert!(err.to_string().contains("`password` is required"));
    }

    #[test]
    fn round_trips() {
        let a = Account::new("carol", "$2b$12$abc", Some("admin".into())).unwrap();
        let back: Account = serde_json::from_str(&serde_json::to_string(&a).unwrap()).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn role_change_is_the_only_mutation() {
        let mut a = Account::new("dave", "h", Some("admin".into())).unwrap();
        a.set_role("auditor");
        assert_eq!(a.role(), "auditor");
        a.set_role(" ");
        assert_eq!(a.role(), DEFAULT_ROLE);
    }

    #[test]
    fn persisted_id_is_set_once() {
        let mut p = PersistedAccount::from(Account::new("erin", "h", None).unwrap());
        assert!(p.id().is_none());
        assert_eq!(serde_json::to_value(&p).unwrap().get("id"), None);

        p.assign_id(RecordId::try_from("66a1").unwrap()).unwrap();
        assert_eq!(p.id().map(RecordId::as_str), Some("66a1"));
        assert_eq!(
            p.assign_id(RecordId::try_from("other").unwrap()),
            Err(ValidationError::Immutable("id"))
        );
        assert_eq!(p.id().map(RecordId::as_str), Some("66a1"));
        assert_eq!(serde_json::to_value(&p).unwrap()["id"], json!("66a1"));
    }

    #[test]
    fn persisted_round_trips_with_and_without_id() {
        let fresh = PersistedAccount::from(Account::new("hank", "$2b$12$abc", Some("admin".into())).unwrap());
        let text = serde_json::to_string(&fresh).unwrap();
        assert!(!text.contains("\"id\""));
        let back: PersistedAccount = serde_json::from_str(&text).unwrap();
        assert_eq!(fresh, back);

        let mut stored = fresh.clone();
        stored.assign_id(RecordId::try_from("66a1f0").unwrap()).unwrap();
        let back: PersistedAccount = serde_json::from_str(&serde_json::to_string(&stored).unwrap()).unwrap();
        assert_eq!(stored, back);
        assert_eq!(back.id().map(RecordId::as_str), Some("66a1f0"));
    }

    #[test]
    fn persisted_role_change_matches_account() {
        let mut p = Account::new("ivy", "h", Some("admin".into()))
            .unwrap()
            .into_persisted(RecordId::try_from("id-9").unwrap());
        p.set_role("auditor");
        assert_eq!(p.role(), "auditor");
        p.set_role("");
        assert_eq!(p.role(), DEFAULT_ROLE);
    }

    #[test]
    fn persisted_requires_role() {
        let err = PersistedAccount::try_from(json!({ "username": "f", "password": "h" })).unwrap_err();
        assert_eq!(err, ValidationError::Missing("role"));
        let p = PersistedAccount::try_from(json!({ "username": "f", "password": "h", "role": "user", "_id": "abc" })).unwrap();
        assert_eq!(p.id().map(RecordId::as_str), Some("abc"));
    }

    #[test]
    fn profile_omits_password() {
        let p = Account::new("gina", "secret-hash", None)
            .unwrap()
            .into_persisted(RecordId::try_from("id-1").unwrap());
        let v = serde_json::to_value(p.profile()).unwrap();
        assert_eq!(v, json!({ "id": "id-1", "username": "gina", "role": "user" }));
    }
}
