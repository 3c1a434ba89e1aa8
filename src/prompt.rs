//! Instruction text sent to the model: the extraction prompts and the moodboard directive.
//!
//! The directive is assembled from optional fragments. A fragment whose field is blank
//! yields `None` and is dropped before joining, and a section left with no lines is
//! dropped entirely, so nothing ever renders as a placeholder.

use crate::{
    catalog::{OptionCatalog, OptionCatalogs},
    models::{AttributeField, AttributeRecord, Directive},
};

const INTRO: &str = "Create one high-resolution interior design moodboard image that a designer could present to a client.";

const LAYOUT_RULES: [&str; 4] = [
    "- Arrange everything as a clean collage grid on a light neutral background with even gutters.",
    "- Use photorealistic imagery with soft, natural lighting and accurate colors.",
    "- Give the board one dominant hero image of the finished room, surrounded by smaller detail tiles.",
    "- Keep the overall composition balanced, airy and easy to read at a glance.",
];

const NEGATIVE_CONSTRAINTS: [&str; 4] = [
    "- No people, pets or hands.",
    "- No watermarks, logos or brand names.",
    "- No captions, labels or gibberish text other than the heading.",
    "- No cluttered, overlapping or distorted elements.",
];

struct Section {
    heading: Option<&'static str>,
    lines: Vec<Option<String>>,
}

impl Section {
    fn new(heading: Option<&'static str>, lines: Vec<Option<String>>) -> Self {
        Self { heading, lines }
    }

    fn fixed(heading: &'static str, lines: &[&str]) -> Self {
        Self::new(Some(heading), lines.iter().map(|l| Some(l.to_string())).collect())
    }

    fn render(self) -> Option<String> {
        let lines: Vec<String> = self.lines.into_iter().flatten().collect();
        if lines.is_empty() {
            return None;
        }
        let mut out: Vec<String> = self.heading.map(str::to_string).into_iter().collect();
        out.extend(lines);
        Some(out.join("\n"))
    }
}

fn join_sections(sections: Vec<Section>) -> String {
    sections.into_iter().filter_map(Section::render).collect::<Vec<_>>().join("\n\n")
}

fn filled(record: &AttributeRecord, field: AttributeField) -> Option<&str> {
    let value = record.get(field).trim();
    (!value.is_empty()).then_some(value)
}

/// The listing line for one field, or `None` when the field is blank.
pub fn attribute_line(record: &AttributeRecord, field: AttributeField) -> Option<String> {
    filled(record, field).map(|v| format!("- {}: {}", field.label(), v))
}

/// Pins the scene to the requested room type.
pub fn scene_type_block(record: &AttributeRecord) -> Option<String> {
    filled(record, AttributeField::RoomType).map(|room| {
        format!(
            "- Every photo and vignette on the board must show a {room}.\n\
             - Do not depict any other kind of room or space."
        )
    })
}

/// Tells the model exactly which heading text to render.
pub fn heading_block(record: &AttributeRecord) -> Option<String> {
    filled(record, AttributeField::AestheticStyle).map(|style| {
        format!(
            "- Render the heading text \"{style} Moodboard\" at the top of the board in clean, legible typography.\n\
             - Spell the heading exactly as written."
        )
    })
}

fn checklist_item(record: &AttributeRecord, field: AttributeField, template: fn(&str) -> String) -> Option<String> {
    filled(record, field).map(template)
}

fn checklist(r: &AttributeRecord) -> Vec<Option<String>> {
    vec![
        Some("- A hero image of the room that ties every attribute together.".to_string()),
        checklist_item(r, AttributeField::ColorPalette, |v| format!("- A row of five or six color swatches drawn from: {v}.")),
        checklist_item(r, AttributeField::MaterialPreferences, |v| format!("- Material samples showing {v}.")),
        checklist_item(r, AttributeField::TexturePreferences, |v| format!("- Close-up texture tiles of {v}.")),
        checklist_item(r, AttributeField::FurniturePreferences, |v| format!("- Cut-out furniture pieces: {v}.")),
        checklist_item(r, AttributeField::DecorPreferences, |v| format!("- Decor accents: {v}.")),
        checklist_item(r, AttributeField::LightingPreferences, |v| format!("- At least one light fixture reflecting: {v}.")),
        checklist_item(r, AttributeField::ThemeMood, |v| format!("- An overall atmosphere that feels {v}.")),
    ]
}

/// Renders a record into the moodboard directive. Equal records give equal directives.
pub fn synthesize(record: &AttributeRecord) -> Directive {
    let listing = AttributeField::ALL.into_iter().map(|f| attribute_line(record, f)).collect();

    let text = join_sections(vec![
        Section::new(None, vec![Some(INTRO.to_string())]),
        Section::new(Some("Design attributes:"), listing),
        Section::new(Some("Scene type:"), vec![scene_type_block(record)]),
        Section::new(Some("Heading:"), vec![heading_block(record)]),
        Section::fixed("Layout & style rules:", &LAYOUT_RULES),
        Section::new(Some("Include:"), checklist(record)),
        Section::fixed("Avoid:", &NEGATIVE_CONSTRAINTS),
    ]);
    Directive::new(text)
}

const EXTRACTED_FIELDS: [AttributeField; 10] = [
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
];

fn choice_line(field: AttributeField, catalog: &OptionCatalog) -> String {
    format!(
        "- {}: prefer one of {}; otherwise a short phrase.",
        field.key(),
        catalog.options.join(", ")
    )
}

fn key_guidance(catalogs: &OptionCatalogs) -> Vec<Option<String>> {
    let mut lines: Vec<Option<String>> = EXTRACTED_FIELDS
        .into_iter()
        .filter_map(|f| catalogs.for_field(f).map(|c| Some(choice_line(f, c))))
        .collect();
    lines.push(Some(
        "- the remaining keys: short comma separated phrases describing what is visible or requested.".to_string(),
    ));
    lines.push(Some("- Use an empty string for anything you cannot determine.".to_string()));
    lines
}

fn key_list(fields: &[AttributeField]) -> String {
    fields.iter().map(|f| f.key()).collect::<Vec<_>>().join(", ")
}

/// Instruction for pulling attributes out of a room photograph.
pub fn analysis_instruction(catalogs: &OptionCatalogs) -> String {
    join_sections(vec![
        Section::new(
            None,
            vec![Some(
                "You are an interior design analyst. Study the attached room photograph and describe its design attributes."
                    .to_string(),
            )],
        ),
        Section::new(
            Some("Respond with a single JSON object and nothing else, using exactly these string keys:"),
            vec![Some(key_list(&EXTRACTED_FIELDS))],
        ),
        Section::new(Some("Guidance:"), key_guidance(catalogs)),
    ])
}

/// Instruction for merging user preferences (and an optional photo) into a short brief.
pub fn summary_instruction(hints: &AttributeRecord, has_image: bool, catalogs: &OptionCatalogs) -> String {
    let opening = if has_image {
        "You are an interior design assistant. Combine the attached room photograph with the user's preferences below into a design brief."
    } else {
        "You are an interior design assistant. Turn the user's preferences below into a design brief."
    };

    let preferences: Vec<Option<String>> = if hints.filled().next().is_none() {
        vec![Some("- The user gave no explicit preferences.".to_string())]
    } else {
        AttributeField::ALL
            .into_iter()
            .map(|f| match f {
                AttributeField::Summary => filled(hints, f).map(|v| format!("- Description: {v}")),
                _ => attribute_line(hints, f),
            })
            .collect()
    };

    join_sections(vec![
        Section::new(None, vec![Some(opening.to_string())]),
        Section::new(Some("User preferences:"), preferences),
        Section::new(
            Some("Respond with a single JSON object and nothing else, using exactly these string keys:"),
            vec![Some(key_list(&AttributeField::ALL))],
        ),
        Section::new(
            Some("Guidance:"),
            std::iter::once(Some(
                "- summary: two or three plain sentences describing the envisioned space.".to_string(),
            ))
            .chain(key_guidance(catalogs))
            .collect(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn full_record() -> AttributeRecord {
        AttributeRecord {
            room_type: "Living Room".into(),
            aesthetic_style: "Scandinavian".into(),
            theme_mood: "Calm".into(),
            color_palette: "Neutral Tones".into(),
            material_preferences: "oak, linen".into(),
            texture_preferences: "boucle".into(),
            furniture_preferences: "low sofa".into(),
            decor_preferences: "ceramics".into(),
            lighting_preferences: "paper lanterns".into(),
            notes: "small space".into(),
            summary: "A bright, quiet living room.".into(),
        }
    }

    #[test]
    fn synthesize_is_pure() {
        let record = full_record();
        assert_eq!(synthesize(&record), synthesize(&record.clone()));
    }

    #[test]
    fn blank_fields_produce_no_line() {
        for field in AttributeField::ALL {
            let record = full_record().with(field, "");
            let directive = synthesize(&record);
            let marker = format!("- {}:", field.label());
            assert!(!directive.as_str().contains(&marker), "{} still listed", field.key());
            assert_eq!(attribute_line(&record, field), None);
        }
    }

    #[test]
    fn empty_record_has_no_attribute_sections() {
        let directive = synthesize(&AttributeRecord::default());
        let text = directive.as_str();
        assert!(!text.contains("Design attributes:"));
        assert!(!text.contains("Scene type:"));
        assert!(!text.contains("Heading:"));
        assert!(!text.contains("swatches"));
        assert!(text.contains("Avoid:"));
        for line in text.lines() {
            assert!(!line.trim_end().ends_with(':') || !line.starts_with("- "), "placeholder line: {line}");
        }
    }

    #[test]
    fn balcony_scene_without_notes() {
        let record = AttributeRecord {
            room_type: "Balcony".into(),
            aesthetic_style: "Eclectic".into(),
            color_palette: "Green, Brown".into(),
            notes: "".into(),
            ..Default::default()
        };
        let text = synthesize(&record).to_string();
        assert!(text.contains("Scene type:\n- Every photo and vignette on the board must show a Balcony."));
        assert!(text.contains("\"Eclectic Moodboard\""));
        assert!(text.contains("- Color palette: Green, Brown"));
        assert!(!text.contains("Additional notes"));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn sections_keep_their_order() {
        let text = synthesize(&full_record()).to_string();
        let order = ["Design attributes:", "Scene type:", "Heading:", "Layout & style rules:", "Include:", "Avoid:"];
        let positions: Vec<usize> = order.iter().map(|h| text.find(h).unwrap()).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn analysis_instruction_lists_keys_and_options() {
        let text = analysis_instruction(&OptionCatalogs::STANDARD);
        assert!(text.contains("roomType, aestheticStyle, themeMood, colorPalette"));
        assert!(!text.contains("summary"));
        assert!(text.contains("Japandi"));
    }

    #[test]
    fn summary_instruction_carries_only_filled_hints() {
        let hints = AttributeRecord {
            room_type: "Kitchen".into(),
            summary: "I cook a lot and want warm wood".into(),
            ..Default::default()
        };
        let text = summary_instruction(&hints, true, &OptionCatalogs::STANDARD);
        assert!(text.contains("attached room photograph"));
        assert!(text.contains("- Room type: Kitchen"));
        assert!(text.contains("- Description: I cook a lot and want warm wood"));
        assert!(!text.contains("- Lighting:"));

        let text = summary_instruction(&AttributeRecord::default(), false, &OptionCatalogs::STANDARD);
        assert!(text.contains("no explicit preferences"));
        assert!(!text.contains("photograph"));
    }
}
