use anyhow::{bail, Context as _, Result};
use std::path::PathBuf;
use std::process::Command;

use crate::config::RunType;
use crate::report::Report;
use crate::resolve::Resolved;

/// Files grouped by the command that opens them, in first-seen order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub groups: Vec<(String, Vec<PathBuf>)>,
}

impl Plan {
    pub fn build(resolved: &Resolved) -> Self {
        let mut plan = Self::default();
        for (path, command) in &resolved.assignments {
            match plan.groups.iter_mut().find(|(c, _)| c == command) {
                Some((_, files)) => files.push(path.clone()),
                None => plan.groups.push((command.clone(), vec![path.clone()])),
            }
        }
        plan
    }

    /// The simulate listing: each command followed by its files, indented.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (command, files) in &self.groups {
            out.push('\n');
            out.push_str(command);
            for file in files {
                out.push_str("\n  ");
                out.push_str(&file.display().to_string());
            }
        }
        out
    }

    /// Launch every group, each command once with all of its files as
    /// trailing arguments. A command that cannot be started is reported
    /// and skipped; the remaining groups still run.
    pub fn execute(&self, runtype: RunType, report: &mut Report) {
        for (command, files) in &self.groups {
            log::info!("opening {} file(s) with: {command}", files.len());
            if let Err(err) = launch(command, files, runtype) {
                report.error(format!("{err:#}"));
            }
        }
    }
}

fn launch(command: &str, files: &[PathBuf], runtype: RunType) -> Result<()> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("empty opener command");
    };

    let mut cmd = Command::new(program);
    cmd.args(parts).args(files);

    match runtype {
        RunType::Terminal => {
            // foreground, inherited stdio, wait for the opener
            cmd.status()
                .with_context(|| format!("could not run {command}"))?;
        }
        RunType::Gui => {
            cmd.spawn()
                .with_context(|| format!("could not run {command}"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(pairs: &[(&str, &str)]) -> Resolved {
        Resolved {
            assignments: pairs
                .iter()
                .map(|(path, cmd)| (PathBuf::from(path), cmd.to_string()))
                .collect(),
            unhandled: Vec::new(),
        }
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let plan = Plan::build(&resolved(&[
            ("a.txt", "vim"),
            ("b.png", "feh"),
            ("c.txt", "vim"),
        ]));

        assert_eq!(
            plan.groups,
            vec![
                (
                    "vim".to_string(),
                    vec![PathBuf::from("a.txt"), PathBuf::from("c.txt")]
                ),
                ("feh".to_string(), vec![PathBuf::from("b.png")]),
            ]
        );
    }

    #[test]
    fn render_lists_each_command_with_its_files() {
        let plan = Plan::build(&resolved(&[("a.txt", "vim"), ("b.txt", "vim")]));
        assert_eq!(plan.render(), "\nvim\n  a.txt\n  b.txt");
    }

    #[test]
    fn empty_plan_renders_nothing() {
        let plan = Plan::build(&Resolved::default());
        assert!(plan.groups.is_empty());
        assert_eq!(plan.render(), "");
    }

    #[test]
    fn unknown_command_is_reported_not_fatal() {
        let plan = Plan::build(&resolved(&[
            ("a.txt", "definitely-not-a-real-opener-program"),
            ("b.txt", "true"),
        ]));

        let mut report = Report::new("canopen");
        plan.execute(RunType::Terminal, &mut report);
        assert!(!report.is_empty());
    }
}
