//! Markdown escaping and code-span sizing.

/// Escape characters in running text that Markdown would interpret.
///
/// Inline markup (`\`, `*`, `_`, `` ` ``, `[`, `]`, `<`, `>`, `|`, `~` and
/// `!` before `[`) is always escaped. Block markers (`#`, `-`/`+` bullets
/// and `1.` list numbers) are escaped only at the start of the text, which
/// the caller treats as a potential line start.
///
/// ```
/// use epubmd::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
/// assert_eq!(escape_markdown("1984. A year"), "1984\\. A year");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let rest = escape_line_start(text, &mut out);

    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        let escape = match c {
            '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '>' | '|' | '~' => true,
            '!' => chars.peek() == Some(&'['),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a leading block marker, returning the unconsumed remainder.
fn escape_line_start<'a>(text: &'a str, out: &mut String) -> &'a str {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(b'#') => {
            out.push_str("\\#");
            &text[1..]
        }
        Some(b'-' | b'+') if matches!(bytes.get(1), None | Some(b' ')) => {
            out.push('\\');
            out.push(char::from(bytes[0]));
            &text[1..]
        }
        Some(b'0'..=b'9') => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            let marker = bytes.get(digits).copied();
            let after = bytes.get(digits + 1).copied();
            if matches!(marker, Some(b'.' | b')')) && matches!(after, None | Some(b' ')) {
                out.push_str(&text[..digits]);
                out.push('\\');
                out.push(char::from(bytes[digits]));
                &text[digits + 1..]
            } else {
                text
            }
        }
        _ => text,
    }
}

/// Longest run of `ch` in `content`.
fn longest_run(content: &str, ch: char) -> usize {
    content
        .split(|c| c != ch)
        .map(|run| run.chars().count())
        .max()
        .unwrap_or(0)
}

/// Fence length for a code block: at least 3, longer than any run of the
/// fence character inside.
pub fn calculate_fence_length(content: &str, fence_char: char) -> usize {
    longest_run(content, fence_char).max(2) + 1
}

/// Backtick count for an inline code span containing `content`.
pub fn calculate_inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}

/// Wrap `content` in a backtick code span.
pub fn code_span(content: &str) -> String {
    let ticks = "`".repeat(calculate_inline_code_ticks(content));
    let pad = if content.starts_with('`') || content.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{ticks}{pad}{content}{pad}{ticks}")
}
