use anyhow::Result;
use std::path::PathBuf;

use crate::classify::Classify;
use crate::config::ConfigState;
use crate::dispatch::Plan;
use crate::report::Report;

/// What one invocation asked the pipeline to do with its files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Request {
    pub show_mimes: bool,
    pub simulate: bool,
}

/// Classify every file, evaluate the rules and build the launch plan.
///
/// Returns `None` when the run ends here: `show_mimes` reports each
/// file's media type and `simulate` reports the plan, neither launches
/// anything. Unhandleable files go into one combined report entry and do
/// not keep the returned plan from covering the rest.
pub fn prepare(
    files: &[PathBuf],
    state: &ConfigState,
    classifier: &dyn Classify,
    request: Request,
    report: &mut Report,
) -> Result<Option<Plan>> {
    let mut classified = Vec::with_capacity(files.len());
    for path in files {
        let media = classifier.classify(path)?;
        log::info!("{} classified as {media}", path.display());
        classified.push((path.clone(), media));
    }

    if request.show_mimes {
        for (path, media) in &classified {
            report.info(format!("{} ... {media}", path.display()));
        }
        return Ok(None);
    }

    let resolved = crate::resolve(&classified, state);

    if !resolved.unhandled.is_empty() {
        let mut text = String::from("do not know how to open:");
        for path in &resolved.unhandled {
            text.push('\n');
            text.push_str(&path.display().to_string());
        }
        report.error(text);
    }

    let plan = Plan::build(&resolved);

    if request.simulate {
        if !plan.groups.is_empty() {
            report.info(plan.render());
        }
        return Ok(None);
    }

    Ok(Some(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MediaType;
    use anyhow::{bail, Context as _};
    use std::collections::BTreeMap;
    use std::path::Path;

    struct FixedTypes(BTreeMap<PathBuf, &'static str>);

    impl FixedTypes {
        fn new(pairs: &[(&str, &'static str)]) -> Self {
            Self(
                pairs
                    .iter()
                    .map(|(path, ty)| (PathBuf::from(path), *ty))
                    .collect(),
            )
        }
    }

    impl Classify for FixedTypes {
        fn classify(&self, path: &Path) -> Result<MediaType> {
            let raw = self
                .0
                .get(path)
                .copied()
                .with_context(|| format!("could not open {}", path.display()))?;
            MediaType::parse(raw)
        }
    }

    struct Refusing;

    impl Classify for Refusing {
        fn classify(&self, path: &Path) -> Result<MediaType> {
            bail!("could not open {}", path.display());
        }
    }

    fn text_state() -> ConfigState {
        let mut state = ConfigState::default();
        state.mimes.insert("text".into(), "vim".into());
        state
    }

    #[test]
    fn show_mimes_reports_types_and_plans_nothing() {
        let classifier = FixedTypes::new(&[("a.txt", "text/plain"), ("b.png", "image/png")]);
        let files = vec![PathBuf::from("a.txt"), PathBuf::from("b.png")];
        let mut report = Report::new("canopen");

        let request = Request {
            show_mimes: true,
            ..Request::default()
        };
        let plan = prepare(&files, &text_state(), &classifier, request, &mut report).unwrap();

        assert!(plan.is_none());
        assert_eq!(
            report.infos().collect::<Vec<_>>(),
            vec!["a.txt ... text/plain", "b.png ... image/png"]
        );
        assert_eq!(report.errors().count(), 0);
    }

    #[test]
    fn simulate_renders_the_plan_without_launching() {
        let classifier = FixedTypes::new(&[("a.txt", "text/plain"), ("b.txt", "text/plain")]);
        let files = vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")];
        let mut report = Report::new("canopen");

        let request = Request {
            simulate: true,
            ..Request::default()
        };
        let plan = prepare(&files, &text_state(), &classifier, request, &mut report).unwrap();

        assert!(plan.is_none());
        assert_eq!(
            report.infos().collect::<Vec<_>>(),
            vec!["\nvim\n  a.txt\n  b.txt"]
        );
        assert_eq!(report.errors().count(), 0);
    }

    #[test]
    fn simulate_with_nothing_to_open_reports_no_plan() {
        let classifier = FixedTypes::new(&[("a.bin", "application/octet-stream")]);
        let files = vec![PathBuf::from("a.bin")];
        let mut report = Report::new("canopen");

        let request = Request {
            simulate: true,
            ..Request::default()
        };
        let plan = prepare(&files, &text_state(), &classifier, request, &mut report).unwrap();

        assert!(plan.is_none());
        assert_eq!(report.infos().count(), 0);
        assert_eq!(report.errors().count(), 1);
    }

    #[test]
    fn unhandleable_files_share_one_entry_and_spare_the_rest() {
        let classifier = FixedTypes::new(&[
            ("a.txt", "text/plain"),
            ("b.bin", "application/octet-stream"),
            ("c.bin", "application/x-unknown"),
        ]);
        let files = vec![
            PathBuf::from("a.txt"),
            PathBuf::from("b.bin"),
            PathBuf::from("c.bin"),
        ];
        let mut report = Report::new("canopen");

        let plan = prepare(&files, &text_state(), &classifier, Request::default(), &mut report)
            .unwrap()
            .unwrap();

        assert_eq!(
            report.errors().collect::<Vec<_>>(),
            vec!["do not know how to open:\nb.bin\nc.bin"]
        );
        assert_eq!(
            plan.groups,
            vec![("vim".to_string(), vec![PathBuf::from("a.txt")])]
        );
    }

    #[test]
    fn resolvable_files_come_back_as_a_plan() {
        let classifier = FixedTypes::new(&[("a.txt", "text/plain")]);
        let files = vec![PathBuf::from("a.txt")];
        let mut report = Report::new("canopen");

        let plan = prepare(&files, &text_state(), &classifier, Request::default(), &mut report)
            .unwrap()
            .unwrap();

        assert_eq!(plan.groups.len(), 1);
        assert!(report.is_empty());
    }

    #[test]
    fn classifier_failure_is_fatal() {
        let files = vec![PathBuf::from("gone.txt")];
        let mut report = Report::new("canopen");

        let err = prepare(&files, &text_state(), &Refusing, Request::default(), &mut report)
            .unwrap_err();
        assert!(format!("{err:#}").contains("could not open"));
    }
}
