use std::borrow::Cow;

use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::export::CsvRecord;
use crate::filter::{count_where, percent, Searchable, Summarize};
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::Excused => "excused",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            "late" => Some(Self::Late),
            "excused" => Some(Self::Excused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default, deserialize_with = "crate::tolerant::string_or_number")]
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub class: String,
    pub date: String,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_out: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl AttendanceRecord {
    /// Present and late stamp `time_in` with `now`; only present keeps `time_out`.
    pub fn mark(&mut self, status: AttendanceStatus, now: NaiveTime) {
        self.status = status;
        self.time_in = match status {
            AttendanceStatus::Present | AttendanceStatus::Late => {
                Some(now.format("%I:%M %p").to_string())
            }
            _ => None,
        };
        if status != AttendanceStatus::Present {
            self.time_out = None;
        }
    }
}

fn seed(
    id: &str,
    student: (&str, &str, &str),
    date: &str,
    status: AttendanceStatus,
    times: (Option<&str>, Option<&str>),
    remarks: Option<&str>,
) -> AttendanceRecord {
    AttendanceRecord {
        id: id.into(),
        student_id: student.0.into(),
        student_name: student.1.into(),
        class: student.2.into(),
        date: date.into(),
        status,
        time_in: times.0.map(Into::into),
        time_out: times.1.map(Into::into),
        remarks: remarks.map(Into::into),
    }
}

impl Entity for AttendanceRecord {
    const KIND: &'static str = "attendance";
    const STORAGE_KEY: &'static str = "attendance_records";
    const ID_SCHEME: IdScheme = IdScheme::Timestamp;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        use AttendanceStatus::*;
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        vec![
            seed(
                "1",
                ("SS001", "Sarah Nakato", "P.7A"),
                &today,
                Present,
                (Some("8:00 AM"), Some("3:30 PM")),
                None,
            ),
            seed(
                "2",
                ("SS002", "John Mukasa", "P.6B"),
                &today,
                Late,
                (Some("8:45 AM"), None),
                Some("Transport delay"),
            ),
            seed(
                "3",
                ("SS003", "Mary Namuli", "P.5A"),
                &today,
                Absent,
                (None, None),
                Some("Sick leave"),
            ),
            seed(
                "4",
                ("SS004", "David Ssali", "P.7B"),
                &today,
                Present,
                (Some("7:55 AM"), Some("3:30 PM")),
                None,
            ),
        ]
    }
}

impl Searchable for AttendanceRecord {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.student_name.as_str()),
            Cow::Borrowed(self.student_id.as_str()),
            Cow::Borrowed(self.class.as_str()),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "class" => Some(&self.class),
            "date" => Some(&self.date),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
    pub attendance_rate: f64,
}

impl Summarize for AttendanceRecord {
    type Summary = AttendanceStats;

    fn summarize(items: &[Self]) -> AttendanceStats {
        let present = count_where(items, |r| r.status == AttendanceStatus::Present);
        let late = count_where(items, |r| r.status == AttendanceStatus::Late);
        AttendanceStats {
            total: items.len(),
            present,
            absent: count_where(items, |r| r.status == AttendanceStatus::Absent),
            late,
            excused: count_where(items, |r| r.status == AttendanceStatus::Excused),
            attendance_rate: percent(present + late, items.len()),
        }
    }
}

impl CsvRecord for AttendanceRecord {
    const HEADERS: &'static [&'static str] = &[
        "Student ID",
        "Student Name",
        "Class",
        "Date",
        "Status",
        "Time In",
        "Time Out",
        "Remarks",
    ];
    const FILE_STEM: &'static str = "attendance_records";

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.student_id.clone(),
            self.student_name.clone(),
            self.class.clone(),
            self.date.clone(),
            self.status.as_str().to_string(),
            self.time_in.clone().unwrap_or_default(),
            self.time_out.clone().unwrap_or_default(),
            self.remarks.clone().unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("time")
    }

    #[test]
    fn marking_late_stamps_time_in_and_clears_time_out() {
        let mut r = AttendanceRecord::defaults().remove(0);
        r.mark(AttendanceStatus::Late, at(8, 5));
        assert_eq!(r.time_in.as_deref(), Some("08:05 AM"));
        assert_eq!(r.time_out, None);
    }

    #[test]
    fn marking_present_keeps_time_out() {
        let mut r = AttendanceRecord::defaults().remove(0);
        r.mark(AttendanceStatus::Present, at(13, 30));
        assert_eq!(r.time_in.as_deref(), Some("01:30 PM"));
        assert_eq!(r.time_out.as_deref(), Some("3:30 PM"));
    }

    #[test]
    fn marking_absent_clears_both_times() {
        let mut r = AttendanceRecord::defaults().remove(0);
        r.mark(AttendanceStatus::Absent, at(9, 0));
        assert_eq!((r.time_in, r.time_out), (None, None));
    }

    #[test]
    fn rate_counts_late_as_attended() {
        let s = AttendanceRecord::summarize(&AttendanceRecord::defaults());
        assert_eq!((s.total, s.present, s.late, s.absent), (4, 2, 1, 1));
        assert_eq!(s.attendance_rate, 75.0);
    }

    #[test]
    fn two_value_status_data_still_loads() {
        let raw = r#"[{"id":1,"studentId":"SS001","studentName":"A","class":"P.7A","date":"2024-01-01","status":"absent"}]"#;
        let rows: Vec<AttendanceRecord> = serde_json::from_str(raw).expect("parse");
        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
    }
}
