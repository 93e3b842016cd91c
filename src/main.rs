fn main() {
    if let Err(e) = qsm_bids::cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
