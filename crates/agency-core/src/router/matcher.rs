//! Text normalization and bounded phrase matching

/// Lower-case and collapse whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `phrase` occurs in `text` as a contiguous run that is not glued to
/// surrounding letters or digits. Both sides must already be normalized.
///
/// "ui" matches "fix the ui" but not "build"; "rest api" matches
/// "design rest api for" but not "rest of the api".
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }

    let mut from = 0;
    while let Some(offset) = text[from..].find(phrase) {
        let start = from + offset;
        let end = start + phrase.len();

        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric) {
            return true;
        }

        // Advance one char so overlapping occurrences are still considered
        from = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }
    false
}
