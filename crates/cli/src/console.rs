//! Terminal input and output.

use std::io::{self, Stdout, Write};

use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Line-oriented access to stdin and stdout.
pub struct Console {
    input: Lines<BufReader<Stdin>>,
    output: Stdout,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: BufReader::new(tokio::io::stdin()).lines(),
            output: io::stdout(),
        }
    }

    /// Writer for command output.
    pub fn out(&mut self) -> &mut Stdout {
        &mut self.output
    }

    /// Print `label` and read one line, trimmed. `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written.
    pub async fn read_line(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        Ok(self.input.next_line().await?.map(|l| l.trim().to_string()))
    }

    /// Read a line that must not be logged or echoed back.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written.
    pub async fn read_secret(&mut self, label: &str) -> io::Result<SecretString> {
        let line = self.read_line(label).await?.unwrap_or_default();
        Ok(SecretString::from(line))
    }

    /// Ask a yes/no question; anything but `y`/`yes` is no.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written.
    pub async fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.read_line(&format!("{question} [y/N] ")).await?;
        Ok(answer.is_some_and(|a| matches!(a.to_ascii_lowercase().as_str(), "y" | "yes")))
    }
}
