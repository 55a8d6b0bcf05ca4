fn main() {
    if let Err(err) = report_archiver::app::run() {
        eprintln!("report conversion failed: {err}");
        std::process::exit(1);
    }
}
