use std::borrow::Cow;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::{count_where, Searchable, Summarize};
use crate::models::assignment::Priority;
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Announcement,
    #[default]
    Message,
    Urgent,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Announcement => "announcement",
            Self::Message => "message",
            Self::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Draft,
    Sent,
    Scheduled,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Scheduled => "scheduled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, deserialize_with = "crate::tolerant::string_or_number")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
}

/// ISO-8601 timestamp stamped on new messages.
pub fn message_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Entity for Message {
    const KIND: &'static str = "message";
    const STORAGE_KEY: &'static str = "communication_messages";
    const ID_SCHEME: IdScheme = IdScheme::Timestamp;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        vec![Message {
            id: "1".into(),
            message_type: MessageType::Announcement,
            title: "School Reopening Notice".into(),
            content: "School will reopen on Monday, January 15th. Please ensure all students report by 8:00 AM.".into(),
            sender: "Admin Office".into(),
            recipients: vec!["all".into()],
            date: message_timestamp(),
            status: MessageStatus::Sent,
            priority: Priority::High,
            scheduled_date: None,
        }]
    }
}

impl Searchable for Message {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.title.as_str()),
            Cow::Borrowed(self.content.as_str()),
            Cow::Borrowed(self.sender.as_str()),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "type" => Some(self.message_type.as_str()),
            "status" => Some(self.status.as_str()),
            "priority" => Some(self.priority.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageStats {
    pub total: usize,
    pub sent: usize,
    pub drafts: usize,
    pub scheduled: usize,
}

impl Summarize for Message {
    type Summary = MessageStats;

    fn summarize(items: &[Self]) -> MessageStats {
        MessageStats {
            total: items.len(),
            sent: count_where(items, |m| m.status == MessageStatus::Sent),
            drafts: count_where(items, |m| m.status == MessageStatus::Draft),
            scheduled: count_where(items, |m| m.status == MessageStatus::Scheduled),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    Active,
    Inactive,
}

impl ContactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default, deserialize_with = "crate::tolerant::string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub status: ContactStatus,
}

impl Entity for Contact {
    const KIND: &'static str = "contact";
    const STORAGE_KEY: &'static str = "communication_contacts";
    const ID_SCHEME: IdScheme = IdScheme::Timestamp;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        vec![Contact {
            id: "1".into(),
            name: "Sarah Nakato".into(),
            role: "Parent".into(),
            email: "sarah.nakato@email.com".into(),
            phone: "+256 701 234 567".into(),
            department: "P.7A".into(),
            status: ContactStatus::Active,
        }]
    }
}

impl Searchable for Contact {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.email.as_str()),
            Cow::Borrowed(self.role.as_str()),
            Cow::Borrowed(self.department.as_str()),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "role" => Some(&self.role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactStats {
    pub total: usize,
    pub active: usize,
}

impl Summarize for Contact {
    type Summary = ContactStats;

    fn summarize(items: &[Self]) -> ContactStats {
        ContactStats {
            total: items.len(),
            active: count_where(items, |c| c.status == ContactStatus::Active),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::store::Collection;

    #[test]
    fn new_messages_go_to_the_front() {
        let mut storage = MemoryStorage::new();
        let mut c = Collection::<Message>::load(&storage);
        let mut draft = Message::defaults().remove(0);
        draft.title = "PTA meeting".into();
        draft.status = MessageStatus::Draft;
        let added = c.add(&mut storage, draft, 1_700_000_000_000).expect("add");
        assert_eq!(added.id, "1700000000000");
        assert_eq!(c.items()[0].title, "PTA meeting");

        let s = Message::summarize(c.items());
        assert_eq!((s.total, s.sent, s.drafts), (2, 1, 1));
    }

    #[test]
    fn contact_search_covers_department() {
        let q = crate::filter::ListQuery::new().search(Some("p.7a"));
        assert_eq!(q.apply(&Contact::defaults()).len(), 1);
    }
}
