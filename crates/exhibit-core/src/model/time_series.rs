use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::MultimediaPresentation;

/// A dated event at a map location, optionally narrated by a presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoEvent {
    pub id: Uuid,
    #[serde(default)]
    pub geo_event_group_id: Option<Uuid>,
    #[serde(default)]
    pub multi_media_presentation_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Server timestamp, kept verbatim: installations disagree on offsets.
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub multi_media_presentation: Option<MultimediaPresentation>,
}

/// Events that happened at one location over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoEventGroup {
    pub id: Uuid,
    #[serde(default)]
    pub time_series_id: Option<Uuid>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub geo_events: Vec<GeoEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub geo_event_groups: Vec<GeoEventGroup>,
}
