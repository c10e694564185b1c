use std::process::ExitCode;

fn main() -> ExitCode {
    publisher::cli::build_image_main(std::env::args_os())
}
