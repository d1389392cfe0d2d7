use std::process;

fn main() {
    if let Err(e) = whisk::cli::run() {
        eprintln!("whisk: {}", e);
        process::exit(e.exit_code());
    }
}
