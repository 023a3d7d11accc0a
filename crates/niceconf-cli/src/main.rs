use std::process::ExitCode;

fn main() -> ExitCode {
    niceconf_cli::run()
}
