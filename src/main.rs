mod app;
mod audio;
mod config;
mod error;
mod menu;
mod overlay;
mod pet;
mod platform;
mod render;
mod sprite;

use clap::Parser;

use crate::config::PetConfig;

fn main() {
    env_logger::init();
    let config = PetConfig::parse();
    log::info!("{} starting up (assets: {})", config.name, config.assets.display());

    if let Err(e) = app::run(config) {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
