fn main() {
    if let Err(err) = schemer::repl::run_cli() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
