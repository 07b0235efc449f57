fn main() {
    if let Err(err) = rusty_cfo::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
