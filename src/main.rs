use anyhow::{bail, Result};
use clap::Parser;
use std::process::ExitCode;

use canopen::{cli, session, ConfigState, FileCommand, Report};

fn main() -> ExitCode {
    let args = cli::Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "info" } else { "warn" }),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let name = cli::invocation_name();
    let mut state = ConfigState::default();
    let mut report = Report::new(&name);

    let code = match run(&args, &name, &mut state, &mut report) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report.error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    };

    // one flush per run, messenger-aware even for config errors
    if let Err(err) = report.flush(state.settings.messenger.as_deref()) {
        eprintln!("{name}: {err:#}");
        return ExitCode::FAILURE;
    }

    code
}

fn run(args: &cli::Args, name: &str, state: &mut ConfigState, report: &mut Report) -> Result<()> {
    if args.files.is_empty() {
        bail!("no files to open, use option {name} --help for more information");
    }

    state.load_entry(args.environment.as_deref(), name, args.no_overwrites)?;

    let request = session::Request {
        show_mimes: args.show_mimes,
        simulate: args.simulate,
    };

    if let Some(plan) = session::prepare(&args.files, state, &FileCommand, request, report)? {
        plan.execute(state.settings.effective_runtype(), report);
    }
    Ok(())
}
