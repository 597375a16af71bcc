//! Text normalization helpers for slugs and tags.

/// Build a URL slug from a title: lowercase, alphanumerics kept, runs of
/// anything else collapsed to a single dash.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Normalize a user-supplied tag name. Returns None when nothing usable
/// remains.
pub fn normalize_tag(input: &str) -> Option<String> {
    let tag = slugify(input);
    if tag.is_empty() { None } else { Some(tag) }
}

/// Escape `%` and `_` so user input can be embedded in a LIKE pattern with
/// `ESCAPE '\'`.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Midjourney Portrait Pack"), "midjourney-portrait-pack");
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("  SEO -- Blog!! Writer  "), "seo-blog-writer");
        assert_eq!(slugify("___"), "");
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag(" ChatGPT 4 "), Some("chatgpt-4".to_string()));
        assert_eq!(normalize_tag("!!!"), None);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
