use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::classify::MediaType;
use crate::config::ConfigState;

/// Outcome of rule evaluation for one invocation's files.
#[derive(Debug, Default)]
pub struct Resolved {
    /// file -> final opener command, alias-expanded, in input order.
    pub assignments: Vec<(PathBuf, String)>,
    /// files no rule or fallback covered, in input order.
    pub unhandled: Vec<PathBuf>,
}

/// Decide the opener command for every file.
///
/// Priority per file: first pattern whose glob matches the base name, then
/// the complete media route (`type/subtype`), then the basic media route
/// (bare `type`), then the `fallback` setting. Files nothing covers end
/// up in `unhandled`.
pub fn resolve(files: &[(PathBuf, MediaType)], state: &ConfigState) -> Resolved {
    // complete routes take priority over basic ones
    let mut complete: BTreeMap<&str, &str> = BTreeMap::new();
    let mut basic: BTreeMap<&str, &str> = BTreeMap::new();
    for (key, command) in &state.mimes {
        if key.contains('/') {
            complete.insert(key, command);
        } else {
            basic.insert(key, command);
        }
    }

    let mut out = Resolved::default();
    for (path, media) in files {
        let command = match_pattern(path, state)
            .or_else(|| complete.get(media.full()).copied())
            .or_else(|| basic.get(media.basic()).copied())
            .or(state.settings.fallback.as_deref());

        match command {
            Some(command) => {
                let command = expand_aliases(command, &state.aliases);
                out.assignments.push((path.clone(), command));
            }
            None => out.unhandled.push(path.clone()),
        }
    }
    out
}

fn match_pattern<'a>(path: &Path, state: &'a ConfigState) -> Option<&'a str> {
    let name = path
        .file_name()
        .unwrap_or_else(|| path.as_os_str())
        .to_string_lossy();

    state
        .patterns
        .iter()
        .find(|rule| rule.glob.matches(&name))
        .map(|rule| rule.command.as_str())
}

/// Substitute the whole command through the alias table until it is no
/// longer an alias key. Terminates because the loader keeps the table
/// acyclic.
fn expand_aliases(command: &str, aliases: &BTreeMap<String, String>) -> String {
    let mut current = command;
    while let Some(next) = aliases.get(current) {
        current = next.as_str();
    }
    current.to_string()
}
