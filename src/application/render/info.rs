//! Annotation line parsing for `manim` fences.
//!
//! The annotation line is whatever follows the fence language tag, e.g.
//! `scene=Intro format=gif quality=medium`. Parsing never fails; tokens that
//! are not `key=value` pairs with a recognised key contribute nothing.

/// Options recognised on an annotation line. Absent keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    pub scene: Option<String>,
    pub format: Option<String>,
    pub quality: Option<String>,
}

impl ParsedOptions {
    pub fn is_empty(&self) -> bool {
        self.scene.is_none() && self.format.is_none() && self.quality.is_none()
    }
}

impl From<Option<&str>> for ParsedOptions {
    fn from(info: Option<&str>) -> Self {
        info.map(parse_info_string).unwrap_or_default()
    }
}

/// Extract `scene`, `format` and `quality` from an annotation line.
///
/// A later token for the same key replaces an earlier one.
pub fn parse_info_string(info: &str) -> ParsedOptions {
    let mut options = ParsedOptions::default();

    for token in info.split_whitespace() {
        let mut parts = token.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };

        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }

        let slot = match key {
            "scene" => &mut options.scene,
            "format" => &mut options.format,
            "quality" => &mut options.quality,
            _ => continue,
        };
        *slot = Some(value.to_string());
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_keys_are_extracted() {
        let parsed = parse_info_string("scene=Intro format=gif quality=high");
        assert_eq!(parsed.scene.as_deref(), Some("Intro"));
        assert_eq!(parsed.format.as_deref(), Some("gif"));
        assert_eq!(parsed.quality.as_deref(), Some("high"));
    }

    #[test]
    fn order_and_extra_whitespace_do_not_matter() {
        let parsed = parse_info_string("  quality=medium \t\tscene=Outro  ");
        assert_eq!(parsed.scene.as_deref(), Some("Outro"));
        assert_eq!(parsed.quality.as_deref(), Some("medium"));
        assert_eq!(parsed.format, None);
    }

    #[test]
    fn malformed_and_unknown_tokens_are_ignored() {
        let parsed = parse_info_string("manim scene format=a=b colour=red =png quality=");
        assert!(parsed.is_empty(), "unexpected options: {parsed:?}");
    }

    #[test]
    fn later_token_wins() {
        let parsed = parse_info_string("format=png format=svg");
        assert_eq!(parsed.format.as_deref(), Some("svg"));
    }

    #[test]
    fn empty_and_absent_annotation_yield_nothing() {
        assert!(parse_info_string("").is_empty());
        assert!(parse_info_string("   ").is_empty());
        assert!(ParsedOptions::from(None).is_empty());
    }

    #[test]
    fn keys_are_case_sensitive() {
        let parsed = parse_info_string("Scene=Intro FORMAT=gif");
        assert!(parsed.is_empty());
    }
}
