use anyhow::{bail, Context as _, Result};
use std::{fmt, path::Path, process::Command};

/// A `type/subtype` media classification, e.g. `text/plain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    full: String,
    slash: usize,
}

impl MediaType {
    /// Parse raw classifier output. Anything after a `;` is parameter
    /// noise (charset and friends) and is discarded; what remains must
    /// have the `type/subtype` shape.
    pub fn parse(raw: &str) -> Result<Self> {
        let essence = raw.split(';').next().unwrap_or("").trim();
        let Some(slash) = essence.find('/') else {
            bail!("invalid media type {raw:?}");
        };
        Ok(Self {
            full: essence.to_string(),
            slash,
        })
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    /// The part before the slash, e.g. `text` for `text/plain`.
    pub fn basic(&self) -> &str {
        &self.full[..self.slash]
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Media-type detection seam; the rest of the pipeline only sees this.
pub trait Classify {
    fn classify(&self, path: &Path) -> Result<MediaType>;
}

/// Classification via file(1): `file -Lbi PATH` follows symlinks and
/// prints the bare mime form.
pub struct FileCommand;

impl Classify for FileCommand {
    fn classify(&self, path: &Path) -> Result<MediaType> {
        if !path.exists() {
            bail!("could not open {}", path.display());
        }

        let out = Command::new("file")
            .arg("-Lbi")
            .arg(path)
            .output()
            .context("failed to run file(1)")?;

        if !out.status.success() {
            bail!("file -Lbi {} returned {}", path.display(), out.status);
        }

        let raw = String::from_utf8_lossy(&out.stdout);
        MediaType::parse(raw.trim()).with_context(|| {
            format!("file -Lbi {} did not generate valid output", path.display())
        })
    }
}
