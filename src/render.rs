use std::io::{self, Write};

use bat::PrettyPrinter;
use console::style;
use serde_json::Value;

use crate::files::FileChange;
use crate::formatter::FormattedLine;
use crate::providers::types::message::ToolCall;

/// Everything the agent shows the operator while a turn runs.
pub trait Renderer {
    /// A piece of the model's reasoning, streamed ahead of the reply proper.
    fn reasoning(&mut self, text: &str);
    fn response_begins(&mut self);
    fn render_line(&mut self, line: &FormattedLine);
    fn response_ends(&mut self);
    fn tool_calls(&mut self, calls: &[ToolCall]);
    fn file_changed(&mut self, change: &FileChange);
    fn notice(&mut self, message: &str);
    fn error(&mut self, message: &str);
}

/// Styled stdout output.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    in_reasoning: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close an open reasoning section before anything else is printed.
    fn end_reasoning(&mut self) {
        if self.in_reasoning {
            println!();
            println!();
            self.in_reasoning = false;
        }
    }

    fn print_arguments(arguments: &str) {
        let pretty = serde_json::from_str::<Value>(arguments)
            .ok()
            .and_then(|value| serde_json::to_string_pretty(&value).ok());
        let Some(pretty) = pretty else {
            println!("{}", style(arguments).dim());
            return;
        };

        let printed = PrettyPrinter::new()
            .input_from_bytes(pretty.as_bytes())
            .language("json")
            .grid(false)
            .line_numbers(false)
            .print();
        if printed.is_err() {
            println!("{}", pretty);
        }
    }
}

impl Renderer for TerminalRenderer {
    fn reasoning(&mut self, text: &str) {
        if !self.in_reasoning {
            println!("{}", style("Reasoning").blue().bold());
            self.in_reasoning = true;
        }
        print!("{}", style(text).dim());
        let _ = io::stdout().flush();
    }

    fn response_begins(&mut self) {
        self.end_reasoning();
        println!("{}", style("neo").cyan().bold());
    }

    fn render_line(&mut self, line: &FormattedLine) {
        match line {
            FormattedLine::CodeStart { language } => {
                println!("{}", style(format!("```{}", language)).dim())
            }
            FormattedLine::Code(code) => println!("  {}", style(code).green()),
            FormattedLine::CodeEnd => println!("{}", style("```").dim()),
            FormattedLine::Bullet(text) => println!("  {} {}", style("•").cyan(), text),
            FormattedLine::Numbered { number, text } => {
                println!("  {} {}", style(number).cyan(), text)
            }
            FormattedLine::Text(text) => println!("{}", text),
            FormattedLine::Blank => println!(),
        }
    }

    fn response_ends(&mut self) {
        println!();
    }

    fn tool_calls(&mut self, calls: &[ToolCall]) {
        self.end_reasoning();
        println!(
            "{}",
            style(format!("Executing {} tool call(s)", calls.len())).yellow()
        );
        for call in calls {
            println!(
                "{} {} {}",
                style("─").dim(),
                style(&call.name).magenta().bold(),
                style(format!("({})", call.id)).dim()
            );
            Self::print_arguments(&call.arguments);
        }
    }

    fn file_changed(&mut self, change: &FileChange) {
        let verb = match change {
            FileChange::Written(_) => "Created",
            FileChange::Edited(_) => "Edited",
        };
        println!(
            "{} {} {}",
            style("✓").green(),
            verb,
            style(change.path().display()).cyan()
        );
    }

    fn notice(&mut self, message: &str) {
        println!("{}", style(message).yellow());
    }

    fn error(&mut self, message: &str) {
        eprintln!("{} {}", style("error:").red().bold(), message);
    }
}

/// Collects render calls for inspection in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub reasoning: String,
    pub lines: Vec<FormattedLine>,
    pub responses: usize,
    pub tool_calls: Vec<ToolCall>,
    pub changes: Vec<FileChange>,
    pub notices: Vec<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
impl Renderer for RecordingRenderer {
    fn reasoning(&mut self, text: &str) {
        self.reasoning.push_str(text);
    }

    fn response_begins(&mut self) {
        self.responses += 1;
    }

    fn render_line(&mut self, line: &FormattedLine) {
        self.lines.push(line.clone());
    }

    fn response_ends(&mut self) {}

    fn tool_calls(&mut self, calls: &[ToolCall]) {
        self.tool_calls.extend_from_slice(calls);
    }

    fn file_changed(&mut self, change: &FileChange) {
        self.changes.push(change.clone());
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
