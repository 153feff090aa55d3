//! Command-line surface and run entry point.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::harvest::{HostedExtractor, ModuleInfoHost, Platform, RunMode, ScanPipeline};

#[derive(Parser, Debug)]
#[command(name = "vst-harvester")]
#[command(version)]
#[command(
    about = "Scan a directory tree for VST 3 plugins and record their metadata as JSON",
    after_help = "Examples:\n  vst-harvester ~/.vst3\n  vst-harvester ~/.vst3 -o scan_results.json\n  vst-harvester ~/.vst3 -c cumulative_scan.json"
)]
pub struct Cli {
    /// Directory to scan
    pub directory: PathBuf,

    /// Write results to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE", conflicts_with = "cumulative")]
    pub output: Option<PathBuf>,

    /// Merge results into FILE, keeping records already stored there
    #[arg(short = 'c', long = "cumulative", value_name = "FILE")]
    pub cumulative: Option<PathBuf>,

    /// Number of modules to scan at once
    #[arg(
        short,
        long,
        default_value_t = 1,
        env = "VST_HARVESTER_JOBS",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub jobs: u32,

    /// Per-module scan limit in seconds, 0 for none
    #[arg(long, value_name = "SECS", default_value_t = 60, env = "VST_HARVESTER_TIMEOUT")]
    pub timeout: u64,

    /// Use another platform's file naming rules
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn run_mode(&self) -> RunMode {
        match &self.cumulative {
            Some(target) => RunMode::Cumulative {
                target: target.clone(),
            },
            None => RunMode::Fresh {
                output: self.output.clone(),
            },
        }
    }

    pub fn module_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "vst_harvester=warn";
        }
        match self.verbose {
            0 => "vst_harvester=info",
            1 => "vst_harvester=debug",
            _ => "vst_harvester=trace",
        }
    }
}

/// Logs go to stderr; stdout is reserved for the scan document.
pub fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr),
        )
        .init();
}

/// Parses `args`, runs the scan and maps the outcome to an exit code.
///
/// Help and version exit 0; usage errors, I/O failures and unreadable
/// cumulative documents exit 1.
pub fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.log_filter());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = ScanPipeline::new(cli.platform(), HostedExtractor::new(ModuleInfoHost::new()))
        .with_jobs(cli.jobs as usize)
        .with_timeout(cli.module_timeout());
    let mode = cli.run_mode();

    let result = runtime.block_on(pipeline.execute(&cli.directory, &mode, &mut io::stdout()));

    // Timed-out extractions may still be blocking; don't wait for them.
    runtime.shutdown_background();

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("vst-harvester").chain(args.iter().copied()))
    }

    #[test]
    fn test_fresh_mode_defaults() {
        let cli = parse(&["/plugins"]).unwrap();

        assert_eq!(cli.run_mode(), RunMode::Fresh { output: None });
        assert_eq!(cli.jobs, 1);
        assert_eq!(cli.module_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(cli.log_filter(), "vst_harvester=info");
    }

    #[test]
    fn test_output_and_cumulative_modes() {
        let cli = parse(&["/plugins", "-o", "out.json"]).unwrap();
        assert_eq!(
            cli.run_mode(),
            RunMode::Fresh {
                output: Some(PathBuf::from("out.json"))
            }
        );

        let cli = parse(&["-c", "all.json", "/plugins"]).unwrap();
        assert_eq!(
            cli.run_mode(),
            RunMode::Cumulative {
                target: PathBuf::from("all.json")
            }
        );
    }

    #[test]
    fn test_output_conflicts_with_cumulative() {
        let err = parse(&["/plugins", "-o", "a.json", "-c", "b.json"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        assert!(err.use_stderr());
    }

    #[test]
    fn test_directory_is_required() {
        let err = parse(&["-o", "a.json"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_help_is_not_an_error_exit() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(parse(&["/plugins", "-j", "0"]).is_err());
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let cli = parse(&["/plugins", "--timeout", "0"]).unwrap();
        assert_eq!(cli.module_timeout(), None);
    }

    #[test]
    fn test_platform_override_and_verbosity() {
        let cli = parse(&["/plugins", "--platform", "macos", "-vv"]).unwrap();
        assert_eq!(cli.platform(), Platform::MacOs);
        assert_eq!(cli.log_filter(), "vst_harvester=trace");

        let cli = parse(&["/plugins", "-q"]).unwrap();
        assert_eq!(cli.log_filter(), "vst_harvester=warn");
    }
}
