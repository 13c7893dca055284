//! The I/O collaborator (§6.1): a minimal duplex the engine reads input
//! from and writes styled output to. The engine never blocks on I/O while
//! holding partial changes.
//!
//! Replaces the teacher's `View`/`style.rs`/`markup.rs` rendering stack
//! wholesale rather than porting it: terminal rendering is explicitly out
//! of scope (§1), so this crate only needs the narrow seam a concrete
//! front end plugs into. The concrete `CliIo` below keeps the teacher's
//! actual dependency choices for that front end -- `rustyline` for line
//! editing/history, `colored` + `textwrap` for styled, wrapped output.

use colored::Colorize;
use rustyline::DefaultEditor;

/// Visual weight a line of output is printed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Normal,
    Strong,
    Debug,
}

/// A minimal duplex: read a line, write styled text, flush. `read_line`
/// returns `None` on end-of-input.
pub trait IoCollaborator {
    fn read_line(&mut self, prompt: &str) -> Option<String>;
    fn write(&mut self, text: &str, style: Style);
    fn flush(&mut self);
}

/// The default terminal front end: `rustyline` for history-backed line
/// editing, `colored`/`textwrap` for styled, terminal-width-aware output.
pub struct CliIo {
    editor: DefaultEditor,
}

impl CliIo {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self { editor: DefaultEditor::new()? })
    }
}

impl IoCollaborator for CliIo {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Some(line)
            }
            Err(_) => None,
        }
    }

    fn write(&mut self, text: &str, style: Style) {
        let wrapped = textwrap::fill(text, textwrap::Options::with_termwidth());
        let styled = match style {
            Style::Normal => wrapped.normal(),
            Style::Strong => wrapped.bold(),
            Style::Debug => wrapped.dimmed(),
        };
        println!("{styled}");
    }

    fn flush(&mut self) {
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}

/// An in-memory collaborator for tests: reads from a queue of scripted
/// lines, captures every write for assertions.
#[derive(Default)]
pub struct ScriptedIo {
    pub input: std::collections::VecDeque<String>,
    pub output: Vec<(String, Style)>,
}

impl ScriptedIo {
    pub fn with_input(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { input: lines.into_iter().map(Into::into).collect(), output: Vec::new() }
    }
}

impl IoCollaborator for ScriptedIo {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        self.input.pop_front()
    }

    fn write(&mut self, text: &str, style: Style) {
        self.output.push((text.to_string(), style));
    }

    fn flush(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_io_serves_input_in_order_and_ends_with_none() {
        let mut io = ScriptedIo::with_input(["look", "quit"]);
        assert_eq!(io.read_line(">").as_deref(), Some("look"));
        assert_eq!(io.read_line(">").as_deref(), Some("quit"));
        assert_eq!(io.read_line(">"), None);
    }

    #[test]
    fn scripted_io_captures_writes_with_style() {
        let mut io = ScriptedIo::default();
        io.write("hello", Style::Strong);
        assert_eq!(io.output, vec![("hello".to_string(), Style::Strong)]);
    }
}
