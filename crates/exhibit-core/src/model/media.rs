use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// MediaType
// ---------------------------------------------------------------------------

/// Kind of media a file holds. Encoded as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MediaType {
    Image2D,
    Image3D,
    Image360Degree,
    Video2D,
    Video3D,
    Video360Degree,
    Audio,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image2D => "image_2d",
            MediaType::Image3D => "image_3d",
            MediaType::Image360Degree => "image_360",
            MediaType::Video2D => "video_2d",
            MediaType::Video3D => "video_3d",
            MediaType::Video360Degree => "video_360",
            MediaType::Audio => "audio",
        }
    }

    pub fn is_spherical(self) -> bool {
        matches!(self, MediaType::Image360Degree | MediaType::Video360Degree)
    }
}

impl TryFrom<u8> for MediaType {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => MediaType::Image2D,
            1 => MediaType::Image3D,
            2 => MediaType::Image360Degree,
            3 => MediaType::Video2D,
            4 => MediaType::Video3D,
            5 => MediaType::Video360Degree,
            6 => MediaType::Audio,
            other => return Err(format!("unknown media type {other}")),
        })
    }
}

impl From<MediaType> for u8 {
    fn from(t: MediaType) -> u8 {
        match t {
            MediaType::Image2D => 0,
            MediaType::Image3D => 1,
            MediaType::Image360Degree => 2,
            MediaType::Video2D => 3,
            MediaType::Video3D => 4,
            MediaType::Video360Degree => 5,
            MediaType::Audio => 6,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MediaFile
// ---------------------------------------------------------------------------

/// A downloadable media asset. The core never decodes it; the renderer does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration_in_seconds: f32,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub url: Option<String>,
}

impl MediaFile {
    /// Human-readable label for logs.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.file_name.as_deref())
            .unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// PresentationItem / MultimediaPresentation
// ---------------------------------------------------------------------------

/// One media item placed on a slot of a presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationItem {
    pub id: Uuid,
    #[serde(default)]
    pub multimedia_presentation_id: Option<Uuid>,
    #[serde(default)]
    pub media_file_id: Option<String>,
    pub slot_number: i32,
    pub sequence_number: i32,
    pub duration_in_seconds: u32,
    #[serde(default)]
    pub media_file: Option<MediaFile>,
}

impl PresentationItem {
    pub fn label(&self) -> String {
        match &self.media_file {
            Some(m) => m.label().to_string(),
            None => self.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultimediaPresentation {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub presentation_items: Vec<PresentationItem>,
}

impl MultimediaPresentation {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}
