use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Capture timestamp format
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A harvested point of interest
///
/// Every field except the administrative pair (`source`, `timeStamp`) is
/// optional; a field the page does not carry stays `None` and serializes as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "resortName")]
    pub resort_name: Option<String>,

    pub poi_id: Option<i64>,

    pub introduction: Option<String>,

    #[serde(rename = "areaName")]
    pub area_name: Option<String>,

    #[serde(rename = "areaId")]
    pub area_id: Option<i64>,

    pub address: Option<String>,

    pub lat: Option<f64>,

    pub lng: Option<f64>,

    #[serde(rename = "openInfo")]
    pub open_info: Option<String>,

    #[serde(rename = "ticketsInfo")]
    pub tickets_info: Option<String>,

    #[serde(rename = "transInfo")]
    pub trans_info: Option<String>,

    pub tel: Option<String>,

    pub item_site: Option<String>,

    pub item_time: Option<String>,

    #[serde(rename = "payAbstracts")]
    pub pay_abstracts: Option<String>,

    /// Site the record was harvested from
    pub source: String,

    /// Local capture time in `TIMESTAMP_FORMAT`
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
}

impl Record {
    /// Creates an empty record stamped with its source and capture time
    pub fn new(source: impl Into<String>, captured_at: DateTime<Local>) -> Self {
        Self {
            resort_name: None,
            poi_id: None,
            introduction: None,
            area_name: None,
            area_id: None,
            address: None,
            lat: None,
            lng: None,
            open_info: None,
            tickets_info: None,
            trans_info: None,
            tel: None,
            item_site: None,
            item_time: None,
            pay_abstracts: None,
            source: source.into(),
            time_stamp: captured_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Returns true if the geocode lookup filled in both coordinates
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }

    /// Compares every field except the capture timestamp
    pub fn same_content(&self, other: &Record) -> bool {
        Record {
            time_stamp: String::new(),
            ..self.clone()
        } == Record {
            time_stamp: String::new(),
            ..other.clone()
        }
    }
}
