//! SDK bootstrap
//!
//! Loads the voice SDK, runs it with the session's configuration and attaches
//! the resulting client to a controller. A failure at either step is surfaced
//! on the controller as a terminal error status before any call exists.

use crate::client::SdkLoader;
use crate::controller::{CallSessionController, SDK_LOAD_ERROR};
use crate::error::SessionResult;

/// Load the SDK through `loader` and attach a client to `controller`
pub async fn bootstrap(loader: &dyn SdkLoader, controller: &CallSessionController) -> SessionResult<()> {
    let config = controller.config();
    tracing::info!(
        "Loading voice SDK for assistant {}{}",
        config.assistant_id,
        if config.needs_configuration() { " (placeholder credentials)" } else { "" }
    );

    match loader.load().await.and_then(|sdk| sdk.run(&config.run_config())) {
        Ok(client) => {
            controller.attach(client)?;
            tracing::info!("Voice SDK ready");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Voice SDK bootstrap failed: {}", e);
            controller.report_sdk_failure(SDK_LOAD_ERROR);
            Err(e.into())
        }
    }
}
