use std::process::ExitCode;

fn main() -> ExitCode {
    vst_harvester::cli::run(std::env::args_os())
}
