use anyhow::{bail, Context as _, Result};
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Info,
    Error,
}

/// Deferred-output sink. Everything the program wants to say accumulates
/// here and is flushed exactly once per run, so a configured messenger
/// receives one invocation instead of a message per diagnostic.
#[derive(Debug)]
pub struct Report {
    name: String,
    entries: Vec<(Severity, String)>,
}

impl Report {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.entries.push((Severity::Info, text.into()));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.entries.push((Severity::Error, text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Accumulated info lines, oldest first.
    pub fn infos(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(severity, _)| *severity == Severity::Info)
            .map(|(_, text)| text.as_str())
    }

    /// Accumulated error lines, oldest first.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(severity, _)| *severity == Severity::Error)
            .map(|(_, text)| text.as_str())
    }

    /// Emit everything accumulated so far and clear the buffer.
    ///
    /// With a messenger configured, the whole text is handed to it as a
    /// single trailing argument; a messenger that cannot be started or
    /// exits nonzero is an error. Without one, error lines go to stderr
    /// prefixed with the invocation name, info lines to stdout.
    pub fn flush(&mut self, messenger: Option<&str>) -> Result<()> {
        let entries = std::mem::take(&mut self.entries);
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(messenger) = messenger {
            let text = entries
                .iter()
                .map(|(_, text)| text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            return deliver(messenger, &text);
        }

        for (severity, text) in &entries {
            match severity {
                Severity::Info => println!("{text}"),
                Severity::Error => eprintln!("{}: {}", self.name, text),
            }
        }
        Ok(())
    }
}

fn deliver(messenger: &str, text: &str) -> Result<()> {
    let mut parts = messenger.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("messenger setting is empty");
    };

    let status = Command::new(program)
        .args(parts)
        .arg(text)
        .status()
        .with_context(|| format!("messenger command failed: {messenger}"))?;

    if !status.success() {
        bail!("messenger command returned {status}: {messenger}");
    }
    Ok(())
}
