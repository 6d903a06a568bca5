//! Line-oriented terminal seam used by the interactive flows.

use async_trait::async_trait;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt as _, BufReader, Lines, Stdin};

/// Outcome of one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// Entered text without the trailing newline.
    Line(String),
    /// Ctrl-C while waiting for input.
    Interrupted,
    Eof,
}

#[async_trait]
pub trait Console: Send {
    /// Show `prompt` (no newline) and wait for one line.
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<ConsoleInput>;

    fn write(&mut self, text: &str);

    fn write_line(&mut self, text: &str) {
        self.write(text);
        self.write("\n");
    }
}

/// Stdin/stdout console. Ctrl-C only interrupts a pending prompt.
pub struct StdConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl StdConsole {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<ConsoleInput> {
        self.write(prompt);
        tokio::select! {
            line = self.lines.next_line() => Ok(match line? {
                Some(l) => ConsoleInput::Line(l.trim_end_matches('\r').to_string()),
                None => ConsoleInput::Eof,
            }),
            signal = tokio::signal::ctrl_c() => {
                signal?;
                println!();
                Ok(ConsoleInput::Interrupted)
            }
        }
    }

    fn write(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Console fed from a fixed script; everything written is kept for assertions.
#[cfg(test)]
pub(crate) struct ScriptedConsole {
    inputs: std::collections::VecDeque<ConsoleInput>,
    pub output: String,
}

#[cfg(test)]
impl ScriptedConsole {
    pub(crate) fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: lines
                .into_iter()
                .map(|l| ConsoleInput::Line(l.into()))
                .collect(),
            output: String::new(),
        }
    }

    pub(crate) fn push(&mut self, input: ConsoleInput) {
        self.inputs.push_back(input);
    }
}

#[cfg(test)]
#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<ConsoleInput> {
        self.output.push_str(prompt);
        let input = self.inputs.pop_front().unwrap_or(ConsoleInput::Eof);
        if let ConsoleInput::Line(l) = &input {
            self.output.push_str(l);
            self.output.push('\n');
        }
        Ok(input)
    }

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }
}
