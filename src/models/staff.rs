use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::export::{or_placeholder, CsvRecord};
use crate::filter::{count_where, Searchable, Summarize};
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaffType {
    Teaching,
    NonTeaching,
}

impl StaffType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teaching => "teaching",
            Self::NonTeaching => "non-teaching",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaffStatus {
    #[default]
    Active,
    OnLeave,
    Inactive,
    Archived,
    Suspended,
    Terminated,
}

impl StaffStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnLeave => "on-leave",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
            Self::Suspended => "suspended",
            Self::Terminated => "terminated",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub staff_type: StaffType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub status: StaffStatus,
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
}

struct Seed<'a> {
    id: &'a str,
    name: &'a str,
    subject_or_role: &'a str,
    phone: &'a str,
    status: StaffStatus,
    experience: &'a str,
    email: &'a str,
    qualification: &'a str,
    department: &'a str,
    join_date: &'a str,
}

impl Seed<'_> {
    fn teaching(self, classes: &[&str]) -> StaffMember {
        let mut m = self.build(StaffType::Teaching);
        m.subject = Some(self.subject_or_role.into());
        m.classes_taught = classes.iter().map(|c| c.to_string()).collect();
        m
    }

    fn support(self) -> StaffMember {
        let mut m = self.build(StaffType::NonTeaching);
        m.role = Some(self.subject_or_role.into());
        m
    }

    fn build(&self, staff_type: StaffType) -> StaffMember {
        StaffMember {
            id: self.id.into(),
            name: self.name.into(),
            staff_type,
            subject: None,
            role: None,
            phone: self.phone.into(),
            email: Some(self.email.into()),
            status: self.status,
            experience: self.experience.into(),
            qualification: self.qualification.into(),
            department: self.department.into(),
            join_date: self.join_date.into(),
            classes_taught: Vec::new(),
        }
    }
}

impl Entity for StaffMember {
    const KIND: &'static str = "staff";
    const STORAGE_KEY: &'static str = "staff";
    const ID_SCHEME: IdScheme = IdScheme::Prefixed {
        prefix: "STF",
        width: 3,
    };

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        use StaffStatus::*;
        vec![
            Seed {
                id: "STF001",
                name: "Sarah Nakiwala",
                subject_or_role: "Mathematics",
                phone: "+256 700 123 456",
                status: Active,
                experience: "8 years",
                email: "sarah@school.com",
                qualification: "Bachelor of Education",
                department: "Primary Upper",
                join_date: "2016-01-15",
            }
            .teaching(&["P.5A", "P.6B", "P.7A"]),
            Seed {
                id: "STF002",
                name: "John Mugisha",
                subject_or_role: "English",
                phone: "+256 701 234 567",
                status: Active,
                experience: "12 years",
                email: "john@school.com",
                qualification: "Master of Education",
                department: "Primary Upper",
                join_date: "2012-03-20",
            }
            .teaching(&["P.4A", "P.5B", "P.6A"]),
            Seed {
                id: "STF003",
                name: "Grace Namuli",
                subject_or_role: "Science",
                phone: "+256 702 345 678",
                status: Active,
                experience: "6 years",
                email: "grace@school.com",
                qualification: "Diploma in Education",
                department: "Primary Upper",
                join_date: "2018-08-10",
            }
            .teaching(&["P.6A", "P.7B"]),
            Seed {
                id: "STF004",
                name: "David Ssekandi",
                subject_or_role: "Social Studies",
                phone: "+256 703 456 789",
                status: OnLeave,
                experience: "15 years",
                email: "david@school.com",
                qualification: "Bachelor of Arts",
                department: "Primary Upper",
                join_date: "2009-02-14",
            }
            .teaching(&["P.5A", "P.6B"]),
            Seed {
                id: "STF005",
                name: "Mary Achieng",
                subject_or_role: "Art & Craft",
                phone: "+256 704 567 890",
                status: Active,
                experience: "4 years",
                email: "mary@school.com",
                qualification: "Certificate in Education",
                department: "Arts",
                join_date: "2020-09-01",
            }
            .teaching(&["P.4A", "P.5A", "P.6A"]),
            Seed {
                id: "STF006",
                name: "Robert Okello",
                subject_or_role: "Physical Education",
                phone: "+256 705 678 901",
                status: Active,
                experience: "10 years",
                email: "robert@school.com",
                qualification: "Bachelor of Science",
                department: "Sports",
                join_date: "2014-01-15",
            }
            .teaching(&["All Classes"]),
            Seed {
                id: "STF007",
                name: "Alice Namukasa",
                subject_or_role: "Accountant",
                phone: "+256 706 789 012",
                status: Active,
                experience: "7 years",
                email: "alice@school.com",
                qualification: "Bachelor of Commerce",
                department: "Finance",
                join_date: "2017-05-20",
            }
            .support(),
            Seed {
                id: "STF008",
                name: "Peter Mukasa",
                subject_or_role: "IT Support",
                phone: "+256 707 890 123",
                status: Active,
                experience: "5 years",
                email: "peter@school.com",
                qualification: "Diploma in Computer Science",
                department: "IT",
                join_date: "2019-03-15",
            }
            .support(),
        ]
    }
}

impl Searchable for StaffMember {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![Cow::Borrowed(self.name.as_str())];
        if let Some(s) = &self.subject {
            fields.push(Cow::Borrowed(s.as_str()));
        }
        if let Some(r) = &self.role {
            fields.push(Cow::Borrowed(r.as_str()));
        }
        fields.push(Cow::Borrowed(self.id.as_str()));
        fields.push(Cow::Owned(self.classes_taught.join(", ")));
        fields
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "type" => Some(self.staff_type.as_str()),
            "department" => Some(&self.department),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub total: usize,
    pub teaching: usize,
    pub non_teaching: usize,
    pub active: usize,
}

impl Summarize for StaffMember {
    type Summary = StaffStats;

    fn summarize(items: &[Self]) -> StaffStats {
        StaffStats {
            total: items.len(),
            teaching: count_where(items, |m| m.staff_type == StaffType::Teaching),
            non_teaching: count_where(items, |m| m.staff_type == StaffType::NonTeaching),
            active: count_where(items, |m| m.status == StaffStatus::Active),
        }
    }
}

impl CsvRecord for StaffMember {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Name",
        "Type",
        "Email",
        "Phone",
        "Subject/Role",
        "Department",
        "Qualification",
        "Experience",
        "Status",
        "Join Date",
        "Classes Taught",
    ];
    const FILE_STEM: &'static str = "staff_export";

    fn csv_row(&self) -> Vec<String> {
        let subject_or_role = self.subject.as_deref().or(self.role.as_deref());
        let classes = self.classes_taught.join(", ");
        vec![
            self.id.clone(),
            self.name.clone(),
            self.staff_type.as_str().to_string(),
            self.email.clone().unwrap_or_default(),
            self.phone.clone(),
            or_placeholder(subject_or_role, "N/A"),
            self.department.clone(),
            self.qualification.clone(),
            self.experience.clone(),
            self.status.as_str().to_string(),
            self.join_date.clone(),
            or_placeholder(Some(&classes), "N/A"),
        ]
    }
}
