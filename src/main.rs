fn main() {
    let args = std::env::args();

    if let Err(err) = pathlock::run(args) {
        eprintln!("pathlock error: {err:#}");
        std::process::exit(1);
    }
}
