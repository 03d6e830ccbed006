use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::export::CsvRecord;
use crate::filter::{count_where, Searchable, Summarize};
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    InProgress,
    Submitted,
    Overdue,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Submitted => "submitted",
            Self::Overdue => "overdue",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(default, deserialize_with = "crate::tolerant::string_or_number")]
    pub id: String,
    pub title: String,
    pub subject: String,
    pub teacher: String,
    pub due_date: String,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_worked_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_files: Option<Vec<String>>,
}

impl Assignment {
    /// Moving to `submitted` records `today` as the submission date.
    pub fn set_status(&mut self, status: AssignmentStatus, today: NaiveDate) {
        self.status = status;
        if status == AssignmentStatus::Submitted {
            self.submission_date = Some(today.format("%Y-%m-%d").to_string());
        }
    }

    fn bare(id: &str, title: &str, subject: &str, teacher: &str, due: &str) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subject: subject.into(),
            teacher: teacher.into(),
            due_date: due.into(),
            status: AssignmentStatus::Pending,
            description: String::new(),
            priority: Priority::Medium,
            submission_date: None,
            grade: None,
            feedback: None,
            work_content: None,
            last_worked_on: None,
            submission_content: None,
            submission_files: None,
        }
    }
}

impl Entity for Assignment {
    const KIND: &'static str = "assignment";
    const STORAGE_KEY: &'static str = "assignments";
    const ID_SCHEME: IdScheme = IdScheme::Sequence;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        let fractions = Assignment {
            description: "Complete exercises 1-15 on fractions and decimals conversion.".into(),
            priority: Priority::High,
            ..Assignment::bare(
                "1",
                "Mathematics - Fractions Worksheet",
                "Mathematics",
                "Ms. Nakato",
                "2024-06-15",
            )
        };
        let essay = Assignment {
            status: AssignmentStatus::Submitted,
            description: "Write a 300-word essay about \"My Dream for Uganda\".".into(),
            submission_date: Some("2024-06-17".into()),
            grade: Some("A-".into()),
            feedback: Some("Excellent work! Very creative and well-structured essay.".into()),
            submission_content: Some(
                "My dream for Uganda is to see a country where every child has access to quality education..."
                    .into(),
            ),
            submission_files: Some(vec!["essay-draft.docx".into(), "references.pdf".into()]),
            ..Assignment::bare(
                "2",
                "English - Creative Writing Essay",
                "English",
                "Mr. Okello",
                "2024-06-18",
            )
        };
        let plants = Assignment {
            status: AssignmentStatus::InProgress,
            description: "Observe and record plant growth over 7 days. Submit observation chart."
                .into(),
            work_content: Some(
                "Day 1: Planted seeds in different soil types.\nDay 2: No visible growth yet.\nDay 3: Small sprouts appearing in organic soil."
                    .into(),
            ),
            last_worked_on: Some("2024-06-18".into()),
            ..Assignment::bare(
                "3",
                "Science - Plant Growth Experiment",
                "Science",
                "Ms. Apio",
                "2024-06-20",
            )
        };
        let map = Assignment {
            status: AssignmentStatus::Overdue,
            description: "Draw and label the districts of Uganda with their capitals.".into(),
            priority: Priority::High,
            ..Assignment::bare(
                "4",
                "Social Studies - Uganda Map Drawing",
                "Social Studies",
                "Mr. Musoke",
                "2024-06-12",
            )
        };
        vec![fractions, essay, plants, map]
    }
}

impl Searchable for Assignment {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.title.as_str()),
            Cow::Borrowed(self.subject.as_str()),
            Cow::Borrowed(self.teacher.as_str()),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "subject" => Some(&self.subject),
            "priority" => Some(self.priority.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub submitted: usize,
    pub overdue: usize,
}

impl Summarize for Assignment {
    type Summary = AssignmentStats;

    fn summarize(items: &[Self]) -> AssignmentStats {
        AssignmentStats {
            total: items.len(),
            pending: count_where(items, |a| a.status == AssignmentStatus::Pending),
            in_progress: count_where(items, |a| a.status == AssignmentStatus::InProgress),
            submitted: count_where(items, |a| a.status == AssignmentStatus::Submitted),
            overdue: count_where(items, |a| a.status == AssignmentStatus::Overdue),
        }
    }
}

impl CsvRecord for Assignment {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Title",
        "Subject",
        "Teacher",
        "Due Date",
        "Status",
        "Priority",
        "Submission Date",
        "Grade",
    ];
    const FILE_STEM: &'static str = "assignments";

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.subject.clone(),
            self.teacher.clone(),
            self.due_date.clone(),
            self.status.as_str().to_string(),
            self.priority.as_str().to_string(),
            self.submission_date.clone().unwrap_or_default(),
            self.grade.clone().unwrap_or_default(),
        ]
    }
}
