use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError, DefaultOnNull};
use std::fmt;

/// Structured design attributes describing a room. Every field is always present; an
/// unknown value is the empty string. Values that arrive with a non-string JSON type are
/// coerced to empty rather than failing the whole record.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRecord {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub room_type: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub aesthetic_style: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub theme_mood: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub color_palette: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub material_preferences: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub texture_preferences: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub furniture_preferences: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub decor_preferences: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub lighting_preferences: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub notes: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub summary: String,
}

/// Names each field of an [`AttributeRecord`] so stages can walk them uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeField {
    RoomType,
    AestheticStyle,
    ThemeMood,
    ColorPalette,
    MaterialPreferences,
    TexturePreferences,
    FurniturePreferences,
    DecorPreferences,
    LightingPreferences,
    Notes,
    Summary,
}

impl AttributeField {
    pub const ALL: [AttributeField; 11] = [
        AttributeField::RoomType,
        AttributeField::AestheticStyle,
        AttributeField::ThemeMood,
        AttributeField::ColorPalette,
        AttributeField::MaterialPreferences,
        AttributeField::TexturePreferences,
        AttributeField::FurniturePreferences,
        AttributeField::DecorPreferences,
        AttributeField::LightingPreferences,
        AttributeField::Notes,
        AttributeField::Summary,
    ];

    /// Wire name, matching the record's JSON keys.
    pub fn key(self) -> &'static str {
        match self {
            AttributeField::RoomType => "roomType",
            AttributeField::AestheticStyle => "aestheticStyle",
            AttributeField::ThemeMood => "themeMood",
            AttributeField::ColorPalette => "colorPalette",
            AttributeField::MaterialPreferences => "materialPreferences",
            AttributeField::TexturePreferences => "texturePreferences",
            AttributeField::FurniturePreferences => "furniturePreferences",
            AttributeField::DecorPreferences => "decorPreferences",
            AttributeField::LightingPreferences => "lightingPreferences",
            AttributeField::Notes => "notes",
            AttributeField::Summary => "summary",
        }
    }

    /// Human label used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            AttributeField::RoomType => "Room type",
            AttributeField::AestheticStyle => "Aesthetic style",
            AttributeField::ThemeMood => "Theme / mood",
            AttributeField::ColorPalette => "Color palette",
            AttributeField::MaterialPreferences => "Materials",
            AttributeField::TexturePreferences => "Textures",
            AttributeField::FurniturePreferences => "Furniture",
            AttributeField::DecorPreferences => "Decor",
            AttributeField::LightingPreferences => "Lighting",
            AttributeField::Notes => "Additional notes",
            AttributeField::Summary => "Overview",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl AttributeRecord {
    pub fn get(&self, field: AttributeField) -> &str {
        match field {
            AttributeField::RoomType => &self.room_type,
            AttributeField::AestheticStyle => &self.aesthetic_style,
            AttributeField::ThemeMood => &self.theme_mood,
            AttributeField::ColorPalette => &self.color_palette,
            AttributeField::MaterialPreferences => &self.material_preferences,
            AttributeField::TexturePreferences => &self.texture_preferences,
            AttributeField::FurniturePreferences => &self.furniture_preferences,
            AttributeField::DecorPreferences => &self.decor_preferences,
            AttributeField::LightingPreferences => &self.lighting_preferences,
            AttributeField::Notes => &self.notes,
            AttributeField::Summary => &self.summary,
        }
    }

    fn slot_mut(&mut self, field: AttributeField) -> &mut String {
        match field {
            AttributeField::RoomType => &mut self.room_type,
            AttributeField::AestheticStyle => &mut self.aesthetic_style,
            AttributeField::ThemeMood => &mut self.theme_mood,
            AttributeField::ColorPalette => &mut self.color_palette,
            AttributeField::MaterialPreferences => &mut self.material_preferences,
            AttributeField::TexturePreferences => &mut self.texture_preferences,
            AttributeField::FurniturePreferences => &mut self.furniture_preferences,
            AttributeField::DecorPreferences => &mut self.decor_preferences,
            AttributeField::LightingPreferences => &mut self.lighting_preferences,
            AttributeField::Notes => &mut self.notes,
            AttributeField::Summary => &mut self.summary,
        }
    }

    /// Returns a copy of the record with one field replaced.
    pub fn with(mut self, field: AttributeField, value: impl Into<String>) -> Self {
        *self.slot_mut(field) = value.into();
        self
    }

    /// Fields that carry a non-blank value, in declaration order.
    pub fn filled(&self) -> impl Iterator<Item = (AttributeField, &str)> + '_ {
        AttributeField::ALL
            .into_iter()
            .map(move |f| (f, self.get(f)))
            .filter(|(_, v)| !v.trim().is_empty())
    }
}

/// Values a caller may pin when regenerating a moodboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeOverrides {
    #[serde(default)]
    pub aesthetic_style: Option<String>,
    #[serde(default)]
    pub color_palette: Option<String>,
    #[serde(default)]
    pub theme_mood: Option<String>,
}

impl AttributeOverrides {
    /// Lifts the overrides into a sparse record; unset overrides stay empty.
    pub fn to_record(&self) -> AttributeRecord {
        AttributeRecord {
            aesthetic_style: self.aesthetic_style.clone().unwrap_or_default(),
            color_palette: self.color_palette.clone().unwrap_or_default(),
            theme_mood: self.theme_mood.clone().unwrap_or_default(),
            ..AttributeRecord::default()
        }
    }
}

/// Binary media sent inline with an instruction.
#[derive(Debug, Clone)]
pub struct InlineMedia {
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Raw inputs for one inbound call; dropped once the response is sent.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub image: Option<InlineMedia>,
    pub hints: AttributeRecord,
    pub overrides: AttributeOverrides,
}

/// Final generation instruction. Built once by the prompt synthesizer and only read after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive(String);

impl Directive {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- API payloads ---

#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MoodboardRequest {
    #[serde(flatten)]
    pub attributes: AttributeRecord,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub overrides: AttributeOverrides,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SummaryResponse {
    pub summary: String,
    pub attributes: AttributeRecord,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MoodboardResponse {
    pub image_base64: String,
    pub mime_type: String,
    pub prompt: String,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serialized_record_has_every_key() {
        let value = serde_json::to_value(AttributeRecord::default()).unwrap();
        let object = value.as_object().unwrap();
        for field in AttributeField::ALL {
            assert_eq!(object.get(field.key()), Some(&serde_json::json!("")), "{}", field.key());
        }
    }

    #[test]
    fn non_string_values_become_empty() {
        let record: AttributeRecord = serde_json::from_str(
            r#"{"roomType": "Kitchen", "notes": 42, "colorPalette": ["Red"], "themeMood": null}"#,
        )
        .unwrap();
        assert_eq!(record.room_type, "Kitchen");
        assert_eq!(record.notes, "");
        assert_eq!(record.color_palette, "");
        assert_eq!(record.theme_mood, "");
        assert_eq!(record.lighting_preferences, "");
    }

    #[test]
    fn field_keys_round_trip() {
        for field in AttributeField::ALL {
            assert_eq!(AttributeField::from_key(field.key()), Some(field));
        }
        assert_eq!(AttributeField::from_key("image"), None);
    }

    #[test]
    fn with_replaces_one_field_only() {
        let base = AttributeRecord { notes: "keep".into(), ..Default::default() };
        let next = base.clone().with(AttributeField::ThemeMood, "Calm");
        assert_eq!(next.theme_mood, "Calm");
        assert_eq!(next.notes, "keep");
        assert_eq!(base.theme_mood, "");
    }

    #[test]
    fn moodboard_request_reads_flat_fields_and_overrides() {
        let req: MoodboardRequest = serde_json::from_str(
            r#"{"roomType":"Balcony","aestheticStyle":"Eclectic","overrides":{"colorPalette":"Earth Tones"}}"#,
        )
        .unwrap();
        assert_eq!(req.attributes.room_type, "Balcony");
        assert_eq!(req.overrides.color_palette.as_deref(), Some("Earth Tones"));
        assert_eq!(req.overrides.to_record().color_palette, "Earth Tones");
        assert_eq!(req.overrides.to_record().room_type, "");
    }

    #[test]
    fn null_overrides_read_as_none() {
        let req: MoodboardRequest = serde_json::from_str(r#"{"roomType":"Kitchen","overrides":null}"#).unwrap();
        assert_eq!(req.attributes.room_type, "Kitchen");
        assert_eq!(req.overrides, AttributeOverrides::default());
    }
}
