fn main() {
    if let Err(err) = roster_cli::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
