use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::{count_where, Searchable, Summarize};
use crate::models::student::Student;
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Add,
    Edit,
    Delete,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "add" => Some(Self::Add),
            "edit" => Some(Self::Edit),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// A class teacher's student change waiting for an administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingStudentOperation {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Partial student: the full record for `add`, the patch for `edit`.
    #[serde(default)]
    pub student_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_student: Option<Student>,
    pub teacher_name: String,
    /// Submitting user's id, used to scope `students.pending.list`.
    #[serde(default)]
    pub teacher_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PendingStudentOperation {
    /// Id of the student this operation touches, if it targets an existing one.
    pub fn target_id(&self) -> Option<&str> {
        self.original_student
            .as_ref()
            .map(|s| s.id.as_str())
            .or_else(|| self.student_data.get("id").and_then(Value::as_str))
    }
}

impl Entity for PendingStudentOperation {
    const KIND: &'static str = "pending operation";
    const STORAGE_KEY: &'static str = "pending_student_operations";
    const ID_SCHEME: IdScheme = IdScheme::Uuid;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        Vec::new()
    }
}

impl Searchable for PendingStudentOperation {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![Cow::Borrowed(self.teacher_name.as_str())];
        if let Some(name) = self.student_data.get("name").and_then(Value::as_str) {
            fields.push(Cow::Borrowed(name));
        }
        fields
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "type" => Some(self.op_type.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl Summarize for PendingStudentOperation {
    type Summary = PendingStats;

    fn summarize(items: &[Self]) -> PendingStats {
        PendingStats {
            total: items.len(),
            pending: count_where(items, |o| o.status == ReviewStatus::Pending),
            approved: count_where(items, |o| o.status == ReviewStatus::Approved),
            rejected: count_where(items, |o| o.status == ReviewStatus::Rejected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub user: String,
    pub timestamp: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub status: ReviewStatus,
    /// Pending operation this notification announces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl Notification {
    pub fn for_operation(op: &PendingStudentOperation) -> Self {
        Self {
            id: String::new(),
            kind: "student_operation".into(),
            message: format!(
                "{} student request from {}",
                op.op_type.as_str(),
                op.teacher_name
            ),
            user: op.teacher_name.clone(),
            timestamp: op.timestamp.clone(),
            read: false,
            status: ReviewStatus::Pending,
            operation_id: Some(op.id.clone()),
        }
    }
}

impl Entity for Notification {
    const KIND: &'static str = "notification";
    const STORAGE_KEY: &'static str = "admin_notifications";
    const ID_SCHEME: IdScheme = IdScheme::Uuid;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        Vec::new()
    }
}

impl Searchable for Notification {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.message.as_str()),
            Cow::Borrowed(self.user.as_str()),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "read" => Some(if self.read { "true" } else { "false" }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationStats {
    pub total: usize,
    pub unread: usize,
}

impl Summarize for Notification {
    type Summary = NotificationStats;

    fn summarize(items: &[Self]) -> NotificationStats {
        NotificationStats {
            total: items.len(),
            unread: count_where(items, |n| !n.read),
        }
    }
}
