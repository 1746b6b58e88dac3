use clap::Parser;

use canopy_watch::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "canopy_gui", about = "Map of tree health with citizen reporting", version)]
struct Cli {
    /// Base URL of the monitoring API
    #[arg(long = "api-url", env = "CANOPY_API_URL")]
    api_url: Option<String>,
}

fn main() -> iced::Result {
    canopy_watch::init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.api_url {
        config = config.with_api_base(url);
    }
    tracing::info!(api = %config.api_base, "starting canopy_gui");

    canopy_watch::gui_app::run_iced_app(config)
}
