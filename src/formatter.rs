use std::sync::LazyLock;

use regex::Regex;

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+[.)]) (.*)$").expect("numbered item pattern"));

const FENCE: &str = "```";
const DEFAULT_CODE_LANGUAGE: &str = "text";

/// One rendered line of assistant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedLine {
    CodeStart { language: String },
    Code(String),
    CodeEnd,
    Bullet(String),
    Numbered { number: String, text: String },
    Text(String),
    Blank,
}

/// Line-oriented state machine over streamed text.
///
/// Text is buffered until a newline arrives, so a line split across any number of
/// fragments is formatted exactly once. Use a fresh formatter per reply.
#[derive(Debug, Default)]
pub struct TextFormatter {
    buffer: String,
    in_code_block: bool,
    code_language: String,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_code_block(&self) -> bool {
        self.in_code_block
    }

    /// Append a fragment and return every line it completed.
    pub fn feed(&mut self, fragment: &str) -> Vec<FormattedLine> {
        self.buffer.push_str(fragment);

        let mut lines = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            lines.push(self.format_line(line));
        }
        lines
    }

    /// Flush the trailing partial line and close a fence the stream left open.
    pub fn finalize(&mut self) -> Vec<FormattedLine> {
        let mut lines = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            lines.push(self.format_line(line.trim_end_matches('\r')));
        }
        if self.in_code_block {
            self.in_code_block = false;
            self.code_language.clear();
            lines.push(FormattedLine::CodeEnd);
        }
        lines
    }

    fn format_line(&mut self, line: &str) -> FormattedLine {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix(FENCE) {
            if self.in_code_block {
                self.in_code_block = false;
                self.code_language.clear();
                return FormattedLine::CodeEnd;
            }
            let language = rest.trim();
            self.in_code_block = true;
            self.code_language = if language.is_empty() {
                DEFAULT_CODE_LANGUAGE.to_string()
            } else {
                language.to_string()
            };
            return FormattedLine::CodeStart {
                language: self.code_language.clone(),
            };
        }

        if self.in_code_block {
            return FormattedLine::Code(line.to_string());
        }

        if let Some(item) = trimmed
            .strip_prefix("* ")
            .or_else(|| trimmed.strip_prefix("- "))
        {
            return FormattedLine::Bullet(item.trim().to_string());
        }

        if let Some(captures) = NUMBERED_ITEM.captures(trimmed) {
            return FormattedLine::Numbered {
                number: captures[1].to_string(),
                text: captures[2].trim().to_string(),
            };
        }

        if trimmed.is_empty() {
            FormattedLine::Blank
        } else {
            FormattedLine::Text(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(fragments: &[&str]) -> Vec<FormattedLine> {
        let mut formatter = TextFormatter::new();
        let mut lines = Vec::new();
        for fragment in fragments {
            lines.extend(formatter.feed(fragment));
        }
        lines.extend(formatter.finalize());
        lines
    }

    #[test]
    fn test_partial_lines_are_buffered() {
        let mut formatter = TextFormatter::new();
        assert!(formatter.feed("Hel").is_empty());
        assert_eq!(
            formatter.feed("lo\nwor"),
            vec![FormattedLine::Text("Hello".into())]
        );
        assert_eq!(
            formatter.finalize(),
            vec![FormattedLine::Text("wor".into())]
        );
    }

    #[test]
    fn test_code_fence_with_language() {
        let lines = feed_all(&["```rust\nfn main() {}\n", "    let x = 1;\n```\n"]);
        assert_eq!(
            lines,
            vec![
                FormattedLine::CodeStart {
                    language: "rust".into()
                },
                FormattedLine::Code("fn main() {}".into()),
                FormattedLine::Code("    let x = 1;".into()),
                FormattedLine::CodeEnd,
            ]
        );
    }

    #[test]
    fn test_fence_language_defaults_to_text() {
        let lines = feed_all(&["```\n", "- not a bullet\n", "```\n"]);
        assert_eq!(
            lines,
            vec![
                FormattedLine::CodeStart {
                    language: "text".into()
                },
                FormattedLine::Code("- not a bullet".into()),
                FormattedLine::CodeEnd,
            ]
        );
    }

    #[test]
    fn test_truncated_fence_is_closed_on_finalize() {
        let mut formatter = TextFormatter::new();
        formatter.feed("```py\nprint(1)");
        assert!(formatter.in_code_block());
        assert_eq!(
            formatter.finalize(),
            vec![
                FormattedLine::Code("print(1)".into()),
                FormattedLine::CodeEnd
            ]
        );
        assert!(!formatter.in_code_block());
    }

    #[test]
    fn test_lists_and_plain_text() {
        let lines = feed_all(&[
            "Steps:\n* first\n- second\n",
            "1. one\n12) twelve\n3.no space\n\n  padded  \n",
        ]);
        assert_eq!(
            lines,
            vec![
                FormattedLine::Text("Steps:".into()),
                FormattedLine::Bullet("first".into()),
                FormattedLine::Bullet("second".into()),
                FormattedLine::Numbered {
                    number: "1.".into(),
                    text: "one".into()
                },
                FormattedLine::Numbered {
                    number: "12)".into(),
                    text: "twelve".into()
                },
                FormattedLine::Text("3.no space".into()),
                FormattedLine::Blank,
                FormattedLine::Text("padded".into()),
            ]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let lines = feed_all(&["a\r\n", "\r\n", "b"]);
        assert_eq!(
            lines,
            vec![
                FormattedLine::Text("a".into()),
                FormattedLine::Blank,
                FormattedLine::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_output_does_not_depend_on_fragment_boundaries() {
        let text = "Intro\n```js\nlet a = 1;\n```\n- item\n2. two\n";
        let whole = feed_all(&[text]);
        let chars: Vec<String> = text.chars().map(String::from).collect();
        let pieces: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(feed_all(&pieces), whole);
    }
}
