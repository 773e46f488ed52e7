use clap::Parser;

mod app;
mod cli;
mod commands;
mod config;
mod core;
mod diff;
mod display;
mod droids;
mod engine;
mod input;
mod providers;

use crate::app::Application;
use crate::cli::Args;
use crate::config::Config;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut app = match Config::load().and_then(|config| Application::new(args, config)) {
        Ok(app) => app,
        Err(err) => {
            display::render_error(&err);
            std::process::exit(2);
        }
    };

    if let Err(err) = app.run().await {
        display::render_error(&err);
        std::process::exit(1);
    }
}
