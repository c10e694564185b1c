use std::process::ExitCode;

fn main() -> ExitCode {
    publisher::cli::publish_main(std::env::args_os())
}
