#![forbid(unsafe_code)]

fn main() {
    beadloom_cli::logging::init();
    if let Err(error) = beadloom_cli::run_from_env() {
        eprintln!("beadloom: {error}");
        std::process::exit(error.exit_code());
    }
}
