//! Users, roles, account status and per-user profiles.
//!
//! Profiles are single JSON objects stored under `profile_<userId>` rather
//! than collections. Older profiles stored `isClassTeacher`,
//! `isDepartmentHead` and `classesTaught` in several shapes; all three are
//! normalized when the profile is parsed, so nothing downstream needs to care.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::{Storage, StorageError};
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Pupil,
    Teacher,
    NonTeaching,
    Parent,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pupil => "pupil",
            Self::Teacher => "teacher",
            Self::NonTeaching => "non-teaching",
            Self::Parent => "parent",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account standing shared by users and student records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Archived,
    Expelled,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Archived => "archived",
            Self::Expelled => "expelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "archived" => Some(Self::Archived),
            "expelled" => Some(Self::Expelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "crate::tolerant::string_or_number")]
    pub id: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    #[serde(default)]
    pub account_status: AccountStatus,
}

/// A user as sent to clients: everything but the password.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    pub account_status: AccountStatus,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            role: u.role,
            name: u.name.clone(),
            avatar: u.avatar.clone(),
            class: u.class.clone(),
            subject: u.subject.clone(),
            department: u.department.clone(),
            children: u.children.clone(),
            account_status: u.account_status,
        }
    }
}

fn user(id: &str, email: &str, password: &str, role: Role, name: &str, avatar: &str) -> User {
    User {
        id: id.into(),
        email: email.into(),
        password: password.into(),
        role,
        name: name.into(),
        avatar: Some(avatar.into()),
        class: None,
        subject: None,
        department: None,
        children: None,
        account_status: AccountStatus::Active,
    }
}

impl Entity for User {
    const KIND: &'static str = "user";
    const STORAGE_KEY: &'static str = "users";
    const ID_SCHEME: IdScheme = IdScheme::Sequence;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        use Role::*;
        let class = |mut u: User, c: &str| {
            u.class = Some(c.into());
            u
        };
        let dept = |mut u: User, subject: Option<&str>, d: &str| {
            u.subject = subject.map(Into::into);
            u.department = Some(d.into());
            u
        };
        let kids = |mut u: User, child: &str| {
            u.children = Some(vec![child.into()]);
            u
        };
        vec![
            class(
                user("1", "john.doe@pupil.rising-stars.edu", "pupil123", Pupil, "John Doe", "👦"),
                "Grade 5A",
            ),
            class(
                user("2", "mary.smith@pupil.rising-stars.edu", "pupil123", Pupil, "Mary Smith", "👧"),
                "Grade 4B",
            ),
            dept(
                user("3", "jane.wilson@teacher.rising-stars.edu", "teacher123", Teacher, "Ms. Jane Wilson", "👩‍🏫"),
                Some("Mathematics"),
                "Primary Education",
            ),
            dept(
                user("4", "robert.brown@teacher.rising-stars.edu", "teacher123", Teacher, "Mr. Robert Brown", "👨‍🏫"),
                Some("Science"),
                "Primary Education",
            ),
            dept(
                user("5", "sarah.jones@staff.rising-stars.edu", "staff123", NonTeaching, "Sarah Jones", "👩‍💼"),
                None,
                "Administration",
            ),
            dept(
                user("6", "mike.davis@staff.rising-stars.edu", "staff123", NonTeaching, "Mike Davis", "👨‍🔧"),
                None,
                "Maintenance",
            ),
            kids(
                user("7", "alice.doe@parent.rising-stars.edu", "parent123", Parent, "Alice Doe", "👩"),
                "John Doe",
            ),
            kids(
                user("8", "mark.smith@parent.rising-stars.edu", "parent123", Parent, "Mark Smith", "👨"),
                "Mary Smith",
            ),
            dept(
                user("9", "admin@rising-stars.edu", "admin123", Admin, "Dr. Patricia Anderson", "👩‍💼"),
                None,
                "School Administration",
            ),
            dept(
                user("10", "principal@rising-stars.edu", "admin123", Admin, "Mr. James Thompson", "👨‍💼"),
                None,
                "Principal Office",
            ),
        ]
    }
}

/// Profile fields the permission layer reads, plus whatever else the
/// dashboard stored, kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, deserialize_with = "crate::tolerant::bool_or_string")]
    pub is_class_teacher: bool,
    #[serde(default, deserialize_with = "crate::tolerant::bool_or_string")]
    pub is_department_head: bool,
    #[serde(default, deserialize_with = "crate::tolerant::list_or_json_string")]
    pub classes_taught: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn profile_key(user_id: &str) -> String {
    format!("profile_{user_id}")
}

/// Starting profile for a user with nothing stored yet.
pub fn seed_profile(user: &User) -> Profile {
    let mut extra = Map::new();
    let mut parts = user.name.split_whitespace().filter(|p| !p.ends_with('.'));
    let first = parts.next().unwrap_or_default();
    let last = parts.last().unwrap_or_default();
    extra.insert("firstName".into(), Value::String(first.into()));
    extra.insert("lastName".into(), Value::String(last.into()));
    extra.insert("email".into(), Value::String(user.email.clone()));
    for (k, v) in [
        ("subject", &user.subject),
        ("department", &user.department),
        ("class", &user.class),
    ] {
        if let Some(v) = v {
            extra.insert(k.into(), Value::String(v.clone()));
        }
    }
    let (is_class_teacher, classes_taught) = match user.id.as_str() {
        "3" => (true, vec!["P.5A".to_string(), "P.6B".to_string()]),
        "4" => (false, vec!["P.6A".to_string(), "P.7B".to_string()]),
        _ => (false, Vec::new()),
    };
    Profile {
        is_class_teacher,
        is_department_head: false,
        classes_taught,
        extra,
    }
}

impl Profile {
    /// True when `other` differs in a field the permission layer reads.
    pub fn grants_differ(&self, other: &Profile) -> bool {
        self.is_class_teacher != other.is_class_teacher
            || self.is_department_head != other.is_department_head
            || self.classes_taught != other.classes_taught
    }
}

/// Stored profile and its revision, or the seeded profile at revision 0
/// when the key is absent or unreadable.
pub fn load_profile(storage: &dyn Storage, user: &User) -> (Profile, u64) {
    let key = profile_key(&user.id);
    match storage.get(&key) {
        Ok(Some(blob)) => match serde_json::from_str::<Profile>(&blob.payload) {
            Ok(p) => (p, blob.revision),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "stored profile unreadable; using seed");
                (seed_profile(user), blob.revision)
            }
        },
        Ok(None) => (seed_profile(user), 0),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "profile read failed; using seed");
            (seed_profile(user), 0)
        }
    }
}

pub fn save_profile(
    storage: &mut dyn Storage,
    user_id: &str,
    profile: &Profile,
    expected: u64,
) -> Result<u64, StorageError> {
    let payload = serde_json::to_string(profile).unwrap_or_else(|_| "{}".to_string());
    storage.put(&profile_key(user_id), &payload, expected)
}

/// Shallow merge of a client patch; the permission fields go through the
/// same tolerant parsing as stored data.
pub fn merge_profile(profile: &Profile, patch: &Map<String, Value>) -> Profile {
    let mut next = profile.clone();
    for (k, v) in patch {
        match k.as_str() {
            "isClassTeacher" => next.is_class_teacher = crate::tolerant::truthy(v),
            "isDepartmentHead" => next.is_department_head = crate::tolerant::truthy(v),
            "classesTaught" => next.classes_taught = crate::tolerant::string_list(v),
            _ => {
                next.extra.insert(k.clone(), v.clone());
            }
        }
    }
    next
}
