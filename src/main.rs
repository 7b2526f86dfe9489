//! imake-cts entry point

fn main() {
    imake_cts::cli::run();
}
