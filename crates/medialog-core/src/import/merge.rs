//! Folding fetched metadata into a user-supplied record

use super::provider::FetchedDetails;
use crate::record::Record;

/// Merge fetched details into `record` without discarding anything the user
/// entered.
///
/// - a text field that is empty takes the fetched value; a filled one gets
///   the fetched value appended after a comma, unless it already holds it
/// - genres are unioned: known names select their symbol, unknown names join
///   the overflow list
/// - fetched images are appended after the existing ones, skipping duplicates
pub fn merge_details(record: &mut Record, details: &FetchedDetails) {
    let category = record.category();
    for (field, value) in &details.fields {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let Some(slot) = record.text_mut(*field) else {
            tracing::debug!("Ignoring fetched {:?}, not a {} field", field, category);
            continue;
        };
        if slot.trim().is_empty() {
            *slot = value.to_string();
        } else if slot.trim() != value {
            slot.push_str(", ");
            slot.push_str(value);
        }
    }

    record.genres_mut().merge_names(category, &details.genres);

    let mut images: Vec<String> = record.real_images().cloned().collect();
    for image in &details.images {
        let image = image.trim();
        if !image.is_empty() && !images.iter().any(|i| i == image) {
            images.push(image.to_string());
        }
    }
    if !images.is_empty() {
        record.set_images(images);
    }
}
