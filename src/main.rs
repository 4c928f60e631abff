use eframe::egui;
use sigap_uploader::app::SigapUploader;
use sigap_uploader::{auth, logging, ApiClient, Config};
use std::process::ExitCode;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "sigap-uploader.toml";

fn main() -> ExitCode {
    let config_path =
        std::env::var("SIGAP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = match Config::load_with_env(&config_path).and_then(Config::into_resolved) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration in {}: {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.logging);

    if config.uploader.persona_id.is_none() {
        tracing::error!("no persona configured: set uploader.persona_id or SIGAP_PERSONA_ID");
        return ExitCode::FAILURE;
    }

    let client = match ApiClient::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    ) {
        Ok(client) => client.with_chunk_size(config.uploader.chunk_size_bytes()),
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let tokens = auth::from_config(&config.auth);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([480.0, 400.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "SIGAP Document Uploader",
        options,
        Box::new(move |cc| Box::new(SigapUploader::new(cc, config, client, tokens))),
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("application error: {}", e);
            ExitCode::FAILURE
        }
    }
}
