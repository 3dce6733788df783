use anyhow::{bail, Context as _, Result};
use glob::Pattern;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

/// How resolved opener commands are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunType {
    /// Run in the foreground, inheriting the controlling terminal, and
    /// wait for the opener to exit.
    Terminal,
    /// Launch detached and do not wait.
    #[default]
    Gui,
}

#[derive(Debug, Default)]
pub struct Settings {
    pub fallback: Option<String>,
    pub messenger: Option<String>,
    pub runtype: Option<RunType>,
}

impl Settings {
    pub fn effective_runtype(&self) -> RunType {
        self.runtype.unwrap_or_default()
    }
}

/// A filename route. Order matters: the first rule whose glob matches a
/// file's base name wins, across all loaded configuration files.
#[derive(Debug)]
pub struct PatternRule {
    pub raw: String,
    pub glob: Pattern,
    pub command: String,
}

/// Everything the configuration files of one session produced.
#[derive(Debug, Default)]
pub struct ConfigState {
    /// alias name -> replacement command; acyclic, enforced on insertion.
    pub aliases: BTreeMap<String, String>,
    /// media-type key (`type/subtype` or bare `type`) -> opener command.
    pub mimes: BTreeMap<String, String>,
    pub patterns: Vec<PatternRule>,
    pub settings: Settings,
    /// canonicalized paths already loaded; re-inclusion is an error.
    loaded: Vec<PathBuf>,
}

/// Root of the per-user configuration tree: `<config dir>/canopen`.
pub fn config_root() -> Result<PathBuf> {
    dirs::config_dir()
        .context("could not determine user configuration directory")
        .map(|dir| dir.join("canopen"))
}

impl ConfigState {
    /// Load the session's entry configuration. Name selection order: the
    /// `--environment` flag, the `CANOPEN` environment variable, the name
    /// the program was invoked under; the name is resolved under
    /// [`config_root`].
    pub fn load_entry(
        &mut self,
        environment: Option<&str>,
        invocation: &str,
        strict: bool,
    ) -> Result<()> {
        let name = environment
            .map(str::to_string)
            .or_else(|| std::env::var("CANOPEN").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| invocation.to_string());

        let path = config_root()?.join(name);
        self.load_file(&path, strict)
    }

    /// Load a configuration named by a `loadconfig` value. A `./` or `/`
    /// prefix loads that literal path; anything else is a bare name under
    /// [`config_root`].
    fn load_reference(&mut self, reference: &str, strict: bool) -> Result<()> {
        let path = if reference.starts_with("./") || reference.starts_with('/') {
            PathBuf::from(reference)
        } else {
            config_root()?.join(reference)
        };
        self.load_file(&path, strict)
    }

    fn load_file(&mut self, path: &Path, strict: bool) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|_| {
            anyhow::anyhow!("could not load configuration, no such file {}", path.display())
        })?;

        if self.loaded.contains(&canonical) {
            bail!("{} has already been loaded", path.display());
        }
        self.loaded.push(canonical.clone());

        let text = fs::read_to_string(&canonical)
            .with_context(|| format!("could not load {}", path.display()))?;

        log::info!("loading configuration: {}", path.display());

        for (idx, raw) in text.lines().enumerate() {
            let step = match parse_line(raw) {
                Ok(Some(directive)) => self.apply(directive, strict),
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            };
            step.with_context(|| format!("line {} in {}", idx + 1, path.display()))?;
        }
        Ok(())
    }

    fn apply(&mut self, directive: Directive, strict: bool) -> Result<()> {
        let Directive { keyword, key, value } = directive;

        match keyword {
            Keyword::Alias => {
                if strict {
                    check_overwrite(self.aliases.get(&key), "alias", &key, &value)?;
                }
                self.aliases.insert(key.clone(), value);
                self.check_alias_loop(&key)?;
            }
            Keyword::Mime => {
                if strict {
                    check_overwrite(self.mimes.get(&key), "mime", &key, &value)?;
                }
                self.mimes.insert(key, value);
            }
            Keyword::Pattern => {
                let position = self.patterns.iter().position(|rule| rule.raw == key);
                if strict {
                    if let Some(i) = position {
                        let previous = &self.patterns[i].command;
                        bail!(
                            "value {value:?} for duplicate pattern {key:?} \
                             overwrites previous value {previous:?}"
                        );
                    }
                }
                match position {
                    // overwrite keeps the rule's original position
                    Some(i) => self.patterns[i].command = value,
                    None => {
                        let glob = Pattern::new(&key)
                            .map_err(|err| anyhow::anyhow!("invalid pattern {key:?}: {err}"))?;
                        self.patterns.push(PatternRule {
                            raw: key,
                            glob,
                            command: value,
                        });
                    }
                }
            }
            Keyword::Setting => self.apply_setting(&key, value, strict)?,
        }
        Ok(())
    }

    fn apply_setting(&mut self, key: &str, value: String, strict: bool) -> Result<()> {
        match key {
            "fallback" => {
                if strict {
                    check_overwrite(self.settings.fallback.as_ref(), "setting", key, &value)?;
                }
                self.settings.fallback = Some(value);
            }
            "messenger" => {
                if strict {
                    check_overwrite(self.settings.messenger.as_ref(), "setting", key, &value)?;
                }
                self.settings.messenger = Some(value);
            }
            "runtype" => {
                let runtype = match value.as_str() {
                    "terminal" => RunType::Terminal,
                    "gui" => RunType::Gui,
                    other => bail!("invalid runtype {other:?}, must be terminal or gui"),
                };
                if strict && self.settings.runtype.is_some() {
                    bail!("value {value:?} for duplicate setting overwrites previous runtype");
                }
                self.settings.runtype = Some(runtype);
            }
            // exempt from the duplicate check, may be used repeatedly
            "loadconfig" => self.load_reference(&value, strict)?,
            other => bail!(
                "invalid setting {other:?}\nvalid keys for settings are: \
                 fallback, messenger, runtype and loadconfig"
            ),
        }
        Ok(())
    }

    /// Walk the alias chain starting at the key that was just inserted;
    /// reaching the key again means the new edge closed a loop. The
    /// visited set stops the walk when a chain merges into older links.
    fn check_alias_loop(&self, key: &str) -> Result<()> {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut current = key;

        while let Some(next) = self.aliases.get(current) {
            if next.as_str() == key {
                bail!("alias {key:?} creates a loop");
            }
            if !visited.insert(next.as_str()) {
                break;
            }
            current = next.as_str();
        }
        Ok(())
    }
}

fn check_overwrite(
    previous: Option<&String>,
    keyword: &str,
    key: &str,
    value: &str,
) -> Result<()> {
    if let Some(previous) = previous {
        bail!(
            "value {value:?} for duplicate {keyword} {key:?} overwrites previous value {previous:?}"
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Alias,
    Mime,
    Pattern,
    Setting,
}

impl Keyword {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "alias" => Some(Self::Alias),
            "mime" => Some(Self::Mime),
            "pattern" => Some(Self::Pattern),
            "setting" => Some(Self::Setting),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Directive {
    keyword: Keyword,
    key: String,
    value: String,
}

/// One configuration line: `<keyword> <key> <value...>`. `#` starts a
/// comment, tabs count as spaces, and the value is the untokenized rest
/// of the line. Blank lines come back as `None`.
fn parse_line(raw: &str) -> Result<Option<Directive>> {
    let line = raw.split('#').next().unwrap_or("");
    let line = line.replace('\t', " ");
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = split_token(line);
    let Some(keyword) = Keyword::parse(word) else {
        bail!(
            "invalid keyword {word:?}\nvalid keywords are: alias, mime, pattern and setting"
        );
    };

    let (key, value) = split_token(rest);
    if key.is_empty() {
        bail!("key missing after keyword");
    }

    let value = value.trim();
    if value.is_empty() {
        bail!("value missing after keyword and key");
    }

    Ok(Some(Directive {
        keyword,
        key: key.to_string(),
        value: value.to_string(),
    }))
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(' ') {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}
