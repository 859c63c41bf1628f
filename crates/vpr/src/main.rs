use std::sync::Arc;

use vpr_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), vpr_core::Error> {
    vpr_core::logging::init("vpr")?;

    let cfg = Arc::new(Config::load()?);

    vpr_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| vpr_core::Error::External(format!("relay bot failed: {e}")))?;

    Ok(())
}
