use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::MultimediaPresentation;
use super::time_series::TimeSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

/// One virtual setting of the museum and the items placed in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inventory_items: Vec<InventoryItem>,
}

fn one() -> f64 {
    1.0
}

/// Any placed object in a room. Its id doubles as the configuration id of
/// the object (e.g. a topographical table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    #[serde(default)]
    pub room_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inventory_type: i32,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default)]
    pub position_z: f64,
    #[serde(default)]
    pub rotation_x: f64,
    #[serde(default)]
    pub rotation_y: f64,
    #[serde(default)]
    pub rotation_z: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    #[serde(default = "one")]
    pub scale_z: f64,
}

/// A menu entry of a table: a heading plus the time series it offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopographicalTableTopic {
    pub id: Uuid,
    #[serde(default)]
    pub topographical_table_id: Option<Uuid>,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "mediaFileImage2DId")]
    pub media_file_image_2d_id: Option<String>,
    #[serde(default)]
    pub time_series: Vec<TimeSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopographicalTable {
    pub id: Uuid,
    #[serde(default)]
    pub topics: Vec<TopographicalTableTopic>,
}

impl TopographicalTable {
    /// Every presentation attached to a geo event anywhere under this table,
    /// in topic → series → group → event order.
    pub fn presentations(&self) -> impl Iterator<Item = &MultimediaPresentation> {
        self.topics
            .iter()
            .flat_map(|t| t.time_series.iter())
            .flat_map(|ts| ts.geo_event_groups.iter())
            .flat_map(|g| g.geo_events.iter())
            .filter_map(|e| e.multi_media_presentation.as_ref())
    }
}

impl Tenant {
    /// Ids of every inventory item across this tenant's rooms.
    pub fn inventory_ids(&self) -> Vec<Uuid> {
        self.rooms
            .iter()
            .flat_map(|r| r.inventory_items.iter().map(|i| i.id))
            .collect()
    }
}
