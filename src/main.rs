use std::process;

fn main() {
    process::exit(acc::cli::run());
}
