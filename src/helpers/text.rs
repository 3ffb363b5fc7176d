/// Converts editor rich text into plain text.
///
/// Tags are dropped, `<br>` and block-closing tags become line breaks, the
/// common entities are decoded, whitespace runs inside a line collapse to one
/// space and runs of blank lines collapse to a single line break.
pub fn strip_html(input: &str) -> String {
    let mut raw = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('<') {
        raw.push_str(&rest[..start]);
        let after = &rest[start..];
        match after.find('>') {
            Some(end) => {
                let tag = after[1..end].trim().to_ascii_lowercase();
                if is_line_break_tag(&tag) {
                    raw.push('\n');
                }
                rest = &after[end + 1..];
            }
            None => {
                // A lone '<' is text, not markup.
                raw.push_str(after);
                rest = "";
            }
        }
    }
    raw.push_str(rest);

    let decoded = decode_entities(&raw);
    let mut lines: Vec<String> = Vec::new();
    for line in decoded.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() && lines.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        lines.push(collapsed);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn is_line_break_tag(tag: &str) -> bool {
    let name = tag
        .trim_end_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or("");
    matches!(
        name,
        "br" | "/p" | "/div" | "/li" | "/h1" | "/h2" | "/h3" | "/blockquote"
    )
}

fn decode_entities(input: &str) -> String {
    const ENTITIES: [(&str, &str); 7] = [
        ("&nbsp;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        // Last, so that "&amp;lt;" decodes to "&lt;" and not "<".
        ("&amp;", "&"),
    ];
    ENTITIES
        .iter()
        .fold(input.to_string(), |acc, (entity, plain)| acc.replace(entity, plain))
}

/// Shortens `text` to at most `max_chars` characters, ending with an ellipsis when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(max_chars - 1).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

/// Collapses plain text onto a single line, for formats where a line break ends the statement.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
