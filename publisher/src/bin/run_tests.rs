use std::process::ExitCode;

fn main() -> ExitCode {
    publisher::cli::run_tests_main(std::env::args_os())
}
