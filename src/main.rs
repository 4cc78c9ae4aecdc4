fn main() {
    if let Err(err) = csv_scrub::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
