use pulldown_cmark::{Event, Options, Parser, html};

const WORDS_PER_MINUTE: usize = 200;

/// Renders a post body to HTML. Raw HTML in the source is escaped, not passed through.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);

    let parser = Parser::new_ext(content, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Minutes to read at 200 words per minute, never less than one.
pub fn reading_minutes(content: &str) -> i64 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown() {
        let html = render_markdown("# Bali\n\nRice *terraces* and ~~crowds~~.");
        assert!(html.contains("<h1>Bali</h1>"));
        assert!(html.contains("<em>terraces</em>"));
        assert!(html.contains("<del>crowds</del>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render_markdown("hello <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_reading_minutes() {
        assert_eq!(reading_minutes(""), 1);
        assert_eq!(reading_minutes("one two three"), 1);
        assert_eq!(reading_minutes(&"word ".repeat(200)), 1);
        assert_eq!(reading_minutes(&"word ".repeat(201)), 2);
        assert_eq!(reading_minutes(&"word ".repeat(1000)), 5);
    }
}
