fn main() {
    if let Err(err) = csv_binder::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
