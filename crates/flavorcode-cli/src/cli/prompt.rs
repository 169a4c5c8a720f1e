//! Line-based prompts on the terminal.
//!
//! Questions and messages go to stderr so stdout only carries command output.
//! End of input counts as dismissing the prompt.

use std::io::{self, Write};

use async_trait::async_trait;
use flavorcode_core::{InputRequest, Prompter, UserMessages};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Typed at a pre-filled prompt to clear the value
const CLEAR_MARKER: &str = "-";

pub struct TerminalPrompter<R = BufReader<Stdin>, W = io::Stderr> {
    reader: tokio::sync::Mutex<R>,
    writer: parking_lot::Mutex<W>,
}

impl TerminalPrompter {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), io::stderr())
    }
}

impl<R, W> TerminalPrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: tokio::sync::Mutex::new(reader),
            writer: parking_lot::Mutex::new(writer),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    fn write(&self, text: &str) {
        let mut writer = self.writer.lock();
        if let Err(e) = writer.write_all(text.as_bytes()).and_then(|_| writer.flush()) {
            tracing::warn!("Failed to write prompt: {}", e);
        }
    }

    /// Next line without its line ending; `None` at end of input
    async fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match self.reader.lock().await.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                tracing::warn!("Failed to read input: {}", e);
                None
            }
        }
    }
}

impl<R, W> UserMessages for TerminalPrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    fn info(&self, message: &str) {
        self.write(&format!("{}\n", message));
    }

    fn error(&self, message: &str) {
        self.write(&format!("Error: {}\n", message));
    }
}

#[async_trait]
impl<R, W> Prompter for TerminalPrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn input(&self, request: InputRequest) -> Option<String> {
        let mut question = request.prompt.clone();
        if !request.placeholder.is_empty() {
            question.push_str(&format!(" ({})", request.placeholder));
        }
        if let Some(value) = &request.value {
            question.push_str(&format!(" [{}, {} to clear]", value, CLEAR_MARKER));
        }
        self.write(&format!("{}: ", question));

        let line = self.read_line().await?;
        let answer = line.trim();
        match &request.value {
            Some(_) if answer == CLEAR_MARKER => Some(String::new()),
            Some(value) if answer.is_empty() => Some(value.clone()),
            _ => Some(answer.to_string()),
        }
    }

    async fn pick(&self, placeholder: &str, choices: &[String]) -> Option<usize> {
        if choices.is_empty() {
            return None;
        }

        let mut menu = format!("{}\n", placeholder);
        for (i, choice) in choices.iter().enumerate() {
            menu.push_str(&format!("  {}) {}\n", i + 1, choice));
        }
        self.write(&menu);

        loop {
            self.write("> ");
            let line = self.read_line().await?;
            let answer = line.trim();
            if answer.is_empty() {
                return None;
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Some(n - 1),
                _ => {
                    self.write(&format!("Please enter a number between 1 and {}\n", choices.len()))
                }
            }
        }
    }
}
