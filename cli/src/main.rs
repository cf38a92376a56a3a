use clap::Parser;
use listmover_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    listmover_cli::init_tracing();

    let code = cli.dispatch().await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
