fn main() {
    if let Err(err) = popdash::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
