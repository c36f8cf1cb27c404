//! Identifier/category codec.
//!
//! Users may prefix an identifier with a quoted category, e.g. `"Movies"q7`.
//! The codec splits that back into the bare id and the category name.

/// Split a raw identifier token into `(id, category)`.
///
/// The category form requires exactly two `"` characters, the first at the
/// very start and the second not in final position. Anything else is treated
/// as a bare id with an empty category.
pub fn split_category(raw: &str) -> (&str, &str) {
    let quotes: Vec<usize> = raw.match_indices('"').map(|(i, _)| i).collect();
    if quotes.len() == 2 && quotes[0] == 0 && quotes[1] != raw.len() - 1 {
        let category = &raw[1..quotes[1]];
        let id = &raw[quotes[1] + 1..];
        (id, category)
    } else {
        (raw, "")
    }
}

/// Case-insensitive comparison of two bare ids.
pub fn ids_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Reconstruct the display form of an id with its category prefix.
pub fn display_id(id: &str, category: &str) -> String {
    if category.is_empty() {
        id.to_string()
    } else {
        format!("\"{category}\"{id}")
    }
}
