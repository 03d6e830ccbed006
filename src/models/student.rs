use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::export::CsvRecord;
use crate::filter::{count_where, Searchable, Summarize};
use crate::models::AccountStatus;
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeStatus {
    Paid,
    Pending,
    Overdue,
}

impl FeeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Pending => "Pending",
            Self::Overdue => "Overdue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub class: String,
    pub age: u32,
    pub parent: String,
    pub phone: String,
    pub fees: FeeStatus,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

fn seed(id: &str, name: &str, class: &str, age: u32, parent: &str, phone: &str, fees: FeeStatus) -> Student {
    Student {
        id: id.into(),
        name: name.into(),
        class: class.into(),
        age,
        parent: parent.into(),
        phone: phone.into(),
        fees,
        status: AccountStatus::Active,
        photo: None,
        email: None,
        address: None,
    }
}

impl Entity for Student {
    const KIND: &'static str = "student";
    const STORAGE_KEY: &'static str = "students";
    const ID_SCHEME: IdScheme = IdScheme::Prefixed {
        prefix: "SS",
        width: 3,
    };

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        use FeeStatus::*;
        vec![
            seed("SS001", "Sarah Nakato", "P.7A", 13, "Robert Nakato", "+256 700 123 456", Paid),
            seed("SS002", "John Mukasa", "P.6B", 12, "Grace Mukasa", "+256 701 234 567", Pending),
            seed("SS003", "Mary Namuli", "P.5A", 11, "Peter Namuli", "+256 702 345 678", Paid),
            seed("SS004", "David Ssali", "P.7B", 14, "Jane Ssali", "+256 703 456 789", Paid),
            seed("SS005", "Ruth Auma", "P.4A", 10, "James Auma", "+256 704 567 890", Overdue),
            seed("SS006", "Samuel Okello", "P.6A", 12, "Helen Okello", "+256 705 678 901", Paid),
            seed("SS007", "Grace Nalubega", "P.5B", 11, "Moses Nalubega", "+256 706 789 012", Pending),
            seed("SS008", "Emmanuel Kato", "P.7A", 13, "Sarah Kato", "+256 707 890 123", Paid),
        ]
    }
}

impl Searchable for Student {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.id.as_str()),
            Cow::Borrowed(self.class.as_str()),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "fees" => Some(self.fees.as_str()),
            "class" => Some(&self.class),
            "status" => Some(self.status.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentStats {
    pub total: usize,
    pub paid: usize,
    pub pending: usize,
    pub overdue: usize,
}

impl Summarize for Student {
    type Summary = StudentStats;

    fn summarize(items: &[Self]) -> StudentStats {
        StudentStats {
            total: items.len(),
            paid: count_where(items, |s| s.fees == FeeStatus::Paid),
            pending: count_where(items, |s| s.fees == FeeStatus::Pending),
            overdue: count_where(items, |s| s.fees == FeeStatus::Overdue),
        }
    }
}

impl CsvRecord for Student {
    const HEADERS: &'static [&'static str] = &[
        "Student ID",
        "Name",
        "Class",
        "Age",
        "Parent",
        "Phone",
        "Fees",
        "Status",
        "Email",
        "Address",
    ];
    const FILE_STEM: &'static str = "students";

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.class.clone(),
            self.age.to_string(),
            self.parent.clone(),
            self.phone.clone(),
            self.fees.as_str().to_string(),
            self.status.as_str().to_string(),
            self.email.clone().unwrap_or_default(),
            self.address.clone().unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{derive_view, CategoryFilter, ListQuery};

    #[test]
    fn stats_cover_whole_collection_even_when_filtered() {
        let q = ListQuery::new().facet("fees", CategoryFilter::parse(Some("Overdue")));
        let view = derive_view(&Student::defaults(), &q);
        assert_eq!(view.matched, 1);
        assert_eq!(view.records[0].name, "Ruth Auma");
        assert_eq!(
            view.stats,
            StudentStats {
                total: 8,
                paid: 5,
                pending: 2,
                overdue: 1
            }
        );
    }

    #[test]
    fn search_matches_id_and_class() {
        let by_id = ListQuery::new().search(Some("ss004"));
        assert_eq!(by_id.apply(&Student::defaults()).len(), 1);
        let by_class = ListQuery::new().search(Some("p.7a"));
        assert_eq!(by_class.apply(&Student::defaults()).len(), 2);
    }

    #[test]
    fn stored_records_without_status_load_as_active() {
        let raw = r#"{"id":"SS009","name":"A","class":"P.4A","age":9,"parent":"B","phone":"1","fees":"Paid"}"#;
        let s: Student = serde_json::from_str(raw).expect("parse");
        assert_eq!(s.status, AccountStatus::Active);
    }
}
