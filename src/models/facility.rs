use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::export::CsvRecord;
use crate::filter::{count_where, Searchable, Summarize};
use crate::store::{Entity, IdScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityType {
    Classroom,
    Laboratory,
    Library,
    Sports,
    Auditorium,
    Office,
    Other,
}

impl FacilityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classroom => "classroom",
            Self::Laboratory => "laboratory",
            Self::Library => "library",
            Self::Sports => "sports",
            Self::Auditorium => "auditorium",
            Self::Office => "office",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
    Reserved,
}

impl FacilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
            Self::Reserved => "reserved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    #[serde(default, deserialize_with = "crate::tolerant::string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub facility_type: FacilityType,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: FacilityStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub last_maintenance: String,
    #[serde(default)]
    pub next_maintenance: String,
}

impl Entity for Facility {
    const KIND: &'static str = "facility";
    const STORAGE_KEY: &'static str = "facilities_data";
    const ID_SCHEME: IdScheme = IdScheme::Timestamp;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn defaults() -> Vec<Self> {
        let amenities = |list: &[&str]| list.iter().map(|a| a.to_string()).collect();
        vec![
            Facility {
                id: "1".into(),
                name: "Science Laboratory".into(),
                facility_type: FacilityType::Laboratory,
                capacity: 30,
                location: "Block A, Floor 2".into(),
                status: FacilityStatus::Available,
                description: "Fully equipped science laboratory with modern equipment".into(),
                amenities: amenities(&["Microscopes", "Lab benches", "Safety equipment", "Chemical storage"]),
                last_maintenance: "2024-05-15".into(),
                next_maintenance: "2024-07-15".into(),
            },
            Facility {
                id: "2".into(),
                name: "Main Library".into(),
                facility_type: FacilityType::Library,
                capacity: 100,
                location: "Block B, Ground Floor".into(),
                status: FacilityStatus::Occupied,
                description: "Central library with extensive book collection".into(),
                amenities: amenities(&["Reading tables", "Computer stations", "WiFi", "Study rooms"]),
                last_maintenance: "2024-04-20".into(),
                next_maintenance: "2024-08-20".into(),
            },
            Facility {
                id: "3".into(),
                name: "Sports Hall".into(),
                facility_type: FacilityType::Sports,
                capacity: 200,
                location: "Sports Complex".into(),
                status: FacilityStatus::Maintenance,
                description: "Indoor sports facility for various activities".into(),
                amenities: amenities(&["Basketball court", "Volleyball nets", "Changing rooms", "Equipment storage"]),
                last_maintenance: "2024-06-01".into(),
                next_maintenance: "2024-06-30".into(),
            },
        ]
    }
}

impl Searchable for Facility {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.location.as_str()),
            Cow::Borrowed(self.description.as_str()),
        ]
    }

    fn facet(&self, name: &str) -> Option<&str> {
        match name {
            "status" => Some(self.status.as_str()),
            "type" => Some(self.facility_type.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityStats {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub maintenance: usize,
    pub reserved: usize,
}

impl Summarize for Facility {
    type Summary = FacilityStats;

    fn summarize(items: &[Self]) -> FacilityStats {
        FacilityStats {
            total: items.len(),
            available: count_where(items, |f| f.status == FacilityStatus::Available),
            occupied: count_where(items, |f| f.status == FacilityStatus::Occupied),
            maintenance: count_where(items, |f| f.status == FacilityStatus::Maintenance),
            reserved: count_where(items, |f| f.status == FacilityStatus::Reserved),
        }
    }
}

impl CsvRecord for Facility {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Name",
        "Type",
        "Capacity",
        "Location",
        "Status",
        "Amenities",
        "Last Maintenance",
        "Next Maintenance",
    ];
    const FILE_STEM: &'static str = "facilities";

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.facility_type.as_str().to_string(),
            self.capacity.to_string(),
            self.location.clone(),
            self.status.as_str().to_string(),
            self.amenities.join("; "),
            self.last_maintenance.clone(),
            self.next_maintenance.clone(),
        ]
    }
}
