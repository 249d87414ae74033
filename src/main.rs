#[tokio::main]
async fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = fichub::cli::Args::parse();
    fichub::cli::init_logging(args.log_level_filter());
    if let Err(e) = fichub::cli::run(&args).await {
        eprintln!("{}", e);
        if let Some(hint) = fichub::cli::hint(&e) {
            eprintln!("hint: {}", hint);
        }
        if args.verbose > 0 {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
