// src/utils/html.rs

/// Sanitizes admin-supplied rich text (course descriptions).
///
/// Whitelist based: safe tags such as `<b>` or `<p>` survive, `<script>` is
/// dropped together with its content, event handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_and_handlers() {
        let cleaned = clean_html(r#"<p onclick="x()">Intro</p><script>alert(1)</script>"#);
        assert_eq!(cleaned, "<p>Intro</p>");
    }
}
