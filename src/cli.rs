use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "canopen", version, about = "Open files with external programs.")]
pub struct Args {
    /// Show mime-types of files, do not do anything else
    #[arg(long = "show-mimes", default_value_t = false)]
    pub show_mimes: bool,

    /// Only say what you would do, do not actually do it
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    /// Put out additional information
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Act as if environment CANOPEN was set to NAME
    #[arg(long, value_name = "NAME")]
    pub environment: Option<String>,

    /// Abort if keys in the configuration are overwritten by later entries
    #[arg(long = "no-overwrites", default_value_t = false)]
    pub no_overwrites: bool,

    /// Files to open
    #[arg(value_name = "PATH")]
    pub files: Vec<PathBuf>,
}

/// Basename the program was invoked under, truncated at the first dot.
/// Determines which configuration is loaded by default, so a symlink named
/// `canopen-mail` loads the `canopen-mail` configuration.
pub fn invocation_name() -> String {
    std::env::args_os()
        .next()
        .map(PathBuf::from)
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .and_then(|n| n.split('.').next().map(str::to_string))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "canopen".to_string())
}
