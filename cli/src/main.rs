use clap::Parser;
use husk_cli::HuskCli;

#[tokio::main]
async fn main() {
    husk_cli::init_logging();
    let cli = HuskCli::parse();
    if let Err(err) = husk_cli::run(cli).await {
        eprintln!("husk: {err:#}");
        std::process::exit(1);
    }
}
