/// Replacement for characters that cannot appear in a path component
const REPLACEMENT: char = '_';

/// Turns an item title or suggested filename into a single path component
///
/// Path separators and control characters are replaced, surrounding
/// whitespace is trimmed, and names that would escape the parent directory
/// (`.`, `..`) or end up empty are rejected.
///
/// # Examples
///
/// ```
/// use comicer::storage::sanitize_component;
///
/// assert_eq!(sanitize_component("Vol 1/2"), Some("Vol 1_2".to_string()));
/// assert_eq!(sanitize_component(".."), None);
/// ```
pub fn sanitize_component(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => REPLACEMENT,
            c if c.is_control() => REPLACEMENT,
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }

    Some(cleaned.to_string())
}
