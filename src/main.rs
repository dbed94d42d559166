use clap::Parser;
use tracing::error;

use mrl_compare::cli::Cli;
use mrl_compare::utils::logging;
use mrl_compare::{App, Config};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let verbose = std::env::var("VERBOSE_LOGGING").is_ok_and(|v| v.trim() == "true");
    logging::init(verbose);

    if let Err(err) = run(cli).await {
        error!("❌ 执行失败: {}", err);
        for cause in err.chain().skip(1) {
            error!("   原因: {}", cause);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let mut app = App::initialize(config)?;
    app.run(cli.command).await
}
