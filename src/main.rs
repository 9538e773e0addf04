use clap::Parser;
use sql_anonymizer::cmd::{self, Cli};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
