//! Generated reports, kept in one book per producer: administrators hold
//! report cards, class teachers hold class reports, department heads hold
//! departmental reports.

use std::borrow::Cow;
use std::fmt::Debug;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::filter::{count_where, Searchable, Summarize};
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportCategory {
    ReportCard,
    ClassReport,
    DepartmentalReport,
}

impl ReportCategory {
    pub const ALL: [Self; 3] = [Self::ReportCard, Self::ClassReport, Self::DepartmentalReport];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReportCard => "report-card",
            Self::ClassReport => "class-report",
            Self::DepartmentalReport => "departmental-report",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "report-card" => Some(Self::ReportCard),
            "class-report" => Some(Self::ClassReport),
            "departmental-report" => Some(Self::DepartmentalReport),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ReportCard => "Report Cards",
            Self::ClassReport => "Class Reports",
            Self::DepartmentalReport => "Departmental Reports",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::ReportCard => "Admin",
            Self::ClassReport => "Class Teacher",
            Self::DepartmentalReport => "Department Head",
        }
    }

    fn user_type(self) -> &'static str {
        match self {
            Self::ReportCard => "admin",
            Self::ClassReport => "teacher",
            Self::DepartmentalReport => "staff",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Ready,
    #[default]
    Processing,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Processing => "Processing",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ready" => Some(Self::Ready),
            "processing" => Some(Self::Processing),
            _ => None,
        }
    }
}

/// One storage key worth of reports.
pub trait ReportBook: Debug + Clone + PartialEq + 'static {
    const CATEGORY: ReportCategory;
    const STORAGE_KEY: &'static str;

    fn seeds() -> Vec<Report<Self>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportCards;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassReports;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartmentalReports;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Report<B> {
    #[serde(default, deserialize_with = "crate::tolerant::string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "type", default)]
    pub report_type: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub icon_name: String,
    #[serde(skip)]
    book: PhantomData<B>,
}

impl<B> Report<B> {
    fn seed(id: &str, title: &str, description: &str, date: &str, kind: &str, status: ReportStatus, icon: &str) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            date: date.into(),
            report_type: kind.into(),
            status,
            icon_name: icon.into(),
            book: PhantomData,
        }
    }
}

impl<B: ReportBook> Entity for Report<B> {
    const KIND: &'static str = "report";
    const STORAGE_KEY: &'static str = B::STORAGE_KEY;
    const ID_SCHEME: IdScheme = IdScheme::Timestamp;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        B::seeds()
    }
}

impl ReportBook for ReportCards {
    const CATEGORY: ReportCategory = ReportCategory::ReportCard;
    const STORAGE_KEY: &'static str = "admin_report_cards";

    fn seeds() -> Vec<Report<Self>> {
        use ReportStatus::*;
        vec![
            Report::seed(
                "1",
                "Progressive Report Card - Term 2",
                "Mid-term academic performance report for individual students",
                "2024-06-10",
                "Progressive",
                Ready,
                "GraduationCap",
            ),
            Report::seed(
                "2",
                "End of Term Report Cards",
                "Final term academic performance reports with comprehensive grades",
                "2024-06-12",
                "Final Term",
                Ready,
                "TrendingUp",
            ),
        ]
    }
}

impl ReportBook for ClassReports {
    const CATEGORY: ReportCategory = ReportCategory::ClassReport;
    const STORAGE_KEY: &'static str = "teacher_class_reports";

    fn seeds() -> Vec<Report<Self>> {
        use ReportStatus::*;
        vec![
            Report::seed(
                "4",
                "P.5 Class Performance Analysis",
                "Overall class performance summary and statistics for Term 2",
                "2024-06-10",
                "Class Performance",
                Ready,
                "BarChart3",
            ),
            Report::seed(
                "5",
                "Attendance Summary Report",
                "Class attendance patterns and statistics",
                "2024-06-08",
                "Attendance",
                Ready,
                "Clock",
            ),
        ]
    }
}

impl ReportBook for DepartmentalReports {
    const CATEGORY: ReportCategory = ReportCategory::DepartmentalReport;
    const STORAGE_KEY: &'static str = "departmental_reports";

    fn seeds() -> Vec<Report<Self>> {
        use ReportStatus::*;
        vec![
            Report::seed(
                "6",
                "Mathematics Department Staff Report",
                "Staff performance and activities summary",
                "2024-06-05",
                "Staff Performance",
                Ready,
                "Users",
            ),
            Report::seed(
                "7",
                "Monthly Budget Report",
                "Department budget utilization and expenses",
                "2024-06-03",
                "Budget",
                Processing,
                "Building",
            ),
        ]
    }
}

/// A report from any book, tagged with where it came from. This is the
/// shape `reports.list` returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    #[serde(rename = "type")]
    pub report_type: String,
    pub status: ReportStatus,
    pub icon_name: String,
    pub category: ReportCategory,
    pub source: &'static str,
    pub user_type: &'static str,
}

impl<B: ReportBook> From<&Report<B>> for ReportListing {
    fn from(r: &Report<B>) -> Self {
        Self {
            id: r.id.clone(),
            title: r.title.clone(),
            description: r.description.clone(),
            date: r.date.clone(),
            report_type: r.report_type.clone(),
            status: r.status,
            icon_name: r.icon_name.clone(),
            category: B::CATEGORY,
            source: B::CATEGORY.source(),
            user_type: B::CATEGORY.user_type(),
        }
    }
}

impl Searchable for ReportListing {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.title.as_str()),
            Cow::Borrowed(self.description.as_str()),
            Cow::Borrowed(self.report_type.as_str()),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "type" => Some(self.report_type.as_str()),
            "category" => Some(self.category.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub total: usize,
    pub ready: usize,
    pub processing: usize,
}

impl Summarize for ReportListing {
    type Summary = ReportStats;

    fn summarize(items: &[Self]) -> ReportStats {
        ReportStats {
            total: items.len(),
            ready: count_where(items, |r| r.status == ReportStatus::Ready),
            processing: count_where(items, |r| r.status == ReportStatus::Processing),
        }
    }
}
