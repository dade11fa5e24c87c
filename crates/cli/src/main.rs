use std::process::ExitCode;

fn main() -> ExitCode {
    recommender_cli::run()
}
