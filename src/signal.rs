use std::path::PathBuf;

use signal_hook::consts::SIGHUP;
use signal_hook::iterator::Signals;
use tracing::{error, info};

use crate::config::{self, SharedConfig};

/// Spawn a thread that reloads the interface configuration on SIGHUP.
pub fn spawn_sighup_handler(
    shared: SharedConfig,
    config_path: PathBuf,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let mut signals = Signals::new([SIGHUP])?;

    std::thread::Builder::new()
        .name("sighup".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                if sig == SIGHUP {
                    info!("received SIGHUP, reloading configuration");
                    match config::reload_from_disk(&shared, &config_path) {
                        Ok(count) => info!(count, "reloaded configuration"),
                        Err(e) => error!(%e, "failed to reload configuration"),
                    }
                }
            }
        })
}
