use std::path::Path;

use anyhow::Result;
use cairn_core::config::CairnConfig;
use cairn_core::CairnServer;

/// Load the configuration at `path` and run the server until the process
/// is killed.
pub fn run(path: &Path) -> Result<()> {
    cairn_core::logging::init();

    let config = CairnConfig::load_from(path)?;
    CairnServer::new(config).serve()
}
