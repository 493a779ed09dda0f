use clap::Parser;

mod cli;
mod commands;

fn main() {
    let cli = cli::Cli::parse();
    std::process::exit(commands::run(cli));
}
