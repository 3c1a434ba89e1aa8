use crate::models::{AttributeField, AttributeRecord};

/// Merges three sources field by field. For each field the first non-blank value wins,
/// checked in this order: override, extracted, user hint. A field none of them supplies
/// stays empty.
pub fn merge(extracted: &AttributeRecord, hints: &AttributeRecord, overrides: &AttributeRecord) -> AttributeRecord {
    AttributeField::ALL
        .into_iter()
        .fold(AttributeRecord::default(), |merged, field| {
            let value = [overrides, extracted, hints]
                .into_iter()
                .map(|source| source.get(field))
                .find(|v| !v.trim().is_empty())
                .unwrap_or_default();
            merged.with(field, value)
        })
}
