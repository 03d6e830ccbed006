use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::export::CsvRecord;
use crate::filter::{count_where, Searchable, Summarize};
use crate::store::{Entity, IdScheme};
use crate::tolerant::split_class_list;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeacherStatus {
    #[default]
    Active,
    OnLeave,
    Inactive,
}

impl TeacherStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnLeave => "on-leave",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub subject: String,
    pub phone: String,
    #[serde(default)]
    pub status: TeacherStatus,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub qualification: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub join_date: String,
    #[serde(default)]
    pub classes_taught: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Form payloads carry classes as a `"P.5A, P.6B"` string under `classes`;
/// rewrite that into `classesTaught` before the payload is merged.
pub fn normalize_class_input(params: &mut Map<String, Value>) {
    if let Some(raw) = params.remove("classes") {
        let list = raw.as_str().map(split_class_list).unwrap_or_default();
        params.insert(
            "classesTaught".to_string(),
            Value::Array(list.into_iter().map(Value::String).collect()),
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn seed(
    id: &str,
    name: &str,
    subject: &str,
    phone: &str,
    status: TeacherStatus,
    experience: &str,
    email: &str,
    qualification: &str,
    department: &str,
    join_date: &str,
    classes: &[&str],
) -> Teacher {
    Teacher {
        id: id.into(),
        name: name.into(),
        subject: subject.into(),
        phone: phone.into(),
        status,
        experience: experience.into(),
        qualification: qualification.into(),
        department: department.into(),
        join_date: join_date.into(),
        classes_taught: classes.iter().map(|c| c.to_string()).collect(),
        email: Some(email.into()),
    }
}

impl Entity for Teacher {
    const KIND: &'static str = "teacher";
    const STORAGE_KEY: &'static str = "teachers";
    const ID_SCHEME: IdScheme = IdScheme::Prefixed {
        prefix: "TCH",
        width: 3,
    };

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        use TeacherStatus::*;
        vec![
            seed(
                "TCH001",
                "Sarah Nakiwala",
                "Mathematics",
                "+256 700 123 456",
                Active,
                "8 years",
                "sarah@school.com",
                "Bachelor of Education",
                "Primary Upper",
                "2016-01-15",
                &["P.5A", "P.6B", "P.7A"],
            ),
            seed(
                "TCH002",
                "John Mugisha",
                "English",
                "+256 701 234 567",
                Active,
                "12 years",
                "john@school.com",
                "Master of Education",
                "Primary Upper",
                "2012-03-20",
                &["P.4A", "P.5B", "P.6A"],
            ),
            seed(
                "TCH003",
                "Grace Namuli",
                "Science",
                "+256 702 345 678",
                Active,
                "6 years",
                "grace@school.com",
                "Diploma in Education",
                "Primary Upper",
                "2018-08-10",
                &["P.6A", "P.7B"],
            ),
            seed(
                "TCH004",
                "David Ssekandi",
                "Social Studies",
                "+256 703 456 789",
                OnLeave,
                "15 years",
                "david@school.com",
                "Bachelor of Arts",
                "Primary Upper",
                "2009-02-14",
                &["P.5A", "P.6B"],
            ),
            seed(
                "TCH005",
                "Mary Achieng",
                "Art & Craft",
                "+256 704 567 890",
                Active,
                "4 years",
                "mary@school.com",
                "Certificate in Education",
                "Arts",
                "2020-09-01",
                &["P.4A", "P.5A", "P.6A"],
            ),
            seed(
                "TCH006",
                "Robert Okello",
                "Physical Education",
                "+256 705 678 901",
                Active,
                "10 years",
                "robert@school.com",
                "Bachelor of Science",
                "Sports",
                "2014-01-15",
                &["All Classes"],
            ),
        ]
    }
}

impl Searchable for Teacher {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.subject.as_str()),
            Cow::Borrowed(self.id.as_str()),
            Cow::Owned(self.classes_taught.join(", ")),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "department" => Some(&self.department),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherStats {
    pub total: usize,
    pub active: usize,
    pub on_leave: usize,
    pub inactive: usize,
}

impl Summarize for Teacher {
    type Summary = TeacherStats;

    fn summarize(items: &[Self]) -> TeacherStats {
        TeacherStats {
            total: items.len(),
            active: count_where(items, |t| t.status == TeacherStatus::Active),
            on_leave: count_where(items, |t| t.status == TeacherStatus::OnLeave),
            inactive: count_where(items, |t| t.status == TeacherStatus::Inactive),
        }
    }
}

impl CsvRecord for Teacher {
    const HEADERS: &'static [&'static str] = &[
        "Teacher ID",
        "Name",
        "Subject",
        "Classes",
        "Experience",
        "Phone",
        "Status",
        "Email",
        "Qualification",
        "Department",
        "Join Date",
    ];
    const FILE_STEM: &'static str = "teachers";

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.subject.clone(),
            self.classes_taught.join(", "),
            self.experience.clone(),
            self.phone.clone(),
            self.status.as_str().to_string(),
            self.email.clone().unwrap_or_default(),
            self.qualification.clone(),
            self.department.clone(),
            self.join_date.clone(),
        ]
    }
}
