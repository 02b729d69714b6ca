//! URL-safe slugs derived from display names
//!
//! Slugs are lowercase ASCII letters, digits and single hyphens, with no
//! leading or trailing hyphen.

/// Derive a slug from a display name
///
/// Letters are lowercased (accents folded where a plain ASCII form exists),
/// and every run of other characters collapses into one hyphen.
///
/// # Example
///
/// ```rust
/// use tour_service::model::slugify;
///
/// assert_eq!(slugify("The Sea Explorer"), "the-sea-explorer");
/// assert_eq!(slugify("  Snow -- Adventurer! "), "snow-adventurer");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars().flat_map(fold) {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Fold common Latin accented letters onto their ASCII base
fn fold(ch: char) -> impl Iterator<Item = char> {
    let folded: &'static str = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ñ' | 'Ñ' => "n",
        'ç' | 'Ç' => "c",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        '&' => " and ",
        _ => "",
    };
    let passthrough = folded.is_empty().then_some(ch);
    folded.chars().chain(passthrough)
}
