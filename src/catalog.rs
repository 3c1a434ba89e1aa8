use serde::Serialize;
use tracing::debug;

use crate::models::{AttributeField, AttributeRecord};

/// A closed, ordered vocabulary. Used to tidy free text, never to reject it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OptionCatalog {
    #[serde(skip)]
    pub name: &'static str,
    pub options: &'static [&'static str],
}

impl OptionCatalog {
    pub const fn new(name: &'static str, options: &'static [&'static str]) -> Self {
        Self { name, options }
    }
}

pub const ROOM_TYPES: OptionCatalog = OptionCatalog::new(
    "RoomType",
    &[
        "Living Room",
        "Bedroom",
        "Kitchen",
        "Dining Room",
        "Bathroom",
        "Home Office",
        "Kids Room",
        "Nursery",
        "Entryway",
        "Balcony",
        "Patio",
        "Studio Apartment",
    ],
);

pub const STYLES: OptionCatalog = OptionCatalog::new(
    "Style",
    &[
        "Modern",
        "Contemporary",
        "Minimalist",
        "Scandinavian",
        "Japandi",
        "Industrial",
        "Bohemian",
        "Mid-Century Modern",
        "Traditional",
        "Transitional",
        "Farmhouse",
        "Coastal",
        "Mediterranean",
        "Art Deco",
        "Rustic",
        "Eclectic",
        "Luxury",
    ],
);

pub const PALETTES: OptionCatalog = OptionCatalog::new(
    "Palette",
    &[
        "Neutral Tones",
        "Earth Tones",
        "Monochrome",
        "Black & White",
        "Pastels",
        "Jewel Tones",
        "Cool Blues",
        "Warm Terracotta",
        "Sage & Cream",
        "Bold & Vibrant",
    ],
);

pub const MOODS: OptionCatalog = OptionCatalog::new(
    "Mood",
    &[
        "Calm",
        "Cozy",
        "Elegant",
        "Energetic",
        "Playful",
        "Romantic",
        "Serene",
        "Dramatic",
        "Fresh",
        "Sophisticated",
    ],
);

/// The four vocabularies shared by the normalizer and the options endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCatalogs {
    pub room_types: OptionCatalog,
    pub styles: OptionCatalog,
    pub palettes: OptionCatalog,
    pub moods: OptionCatalog,
}

impl OptionCatalogs {
    pub const STANDARD: OptionCatalogs = OptionCatalogs {
        room_types: ROOM_TYPES,
        styles: STYLES,
        palettes: PALETTES,
        moods: MOODS,
    };

    /// Catalog that governs a field, if any.
    pub fn for_field(&self, field: AttributeField) -> Option<&OptionCatalog> {
        match field {
            AttributeField::RoomType => Some(&self.room_types),
            AttributeField::AestheticStyle => Some(&self.styles),
            AttributeField::ColorPalette => Some(&self.palettes),
            AttributeField::ThemeMood => Some(&self.moods),
            _ => None,
        }
    }
}

impl Default for OptionCatalogs {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Maps `value` onto the catalog when it reasonably matches, otherwise returns it as is.
///
/// An exact case-insensitive match wins outright. Failing that, the first entry (in
/// catalog order) that contains the value, or is contained by it, is returned. Blank
/// values pass through untouched.
pub fn normalize(value: &str, catalog: &OptionCatalog) -> String {
    let needle = value.trim().to_lowercase();
    if needle.is_empty() {
        return value.to_string();
    }

    let options = catalog.options;
    let exact = options.iter().find(|o| o.to_lowercase() == needle);
    let partial = || {
        options.iter().find(|o| {
            let entry = o.to_lowercase();
            needle.contains(&entry) || entry.contains(&needle)
        })
    };

    exact
        .or_else(partial)
        .map(|o| o.to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Normalizes every catalog-backed field of a record.
pub fn normalize_record(record: &AttributeRecord, catalogs: &OptionCatalogs) -> AttributeRecord {
    AttributeField::ALL
        .into_iter()
        .fold(record.clone(), |next, field| match catalogs.for_field(field) {
            Some(catalog) => {
                let raw = record.get(field);
                let value = normalize(raw, catalog);
                if value != raw {
                    debug!("Normalized {} '{}' -> '{}'", catalog.name, raw, value);
                }
                next.with(field, value)
            }
            None => next,
        })
}
