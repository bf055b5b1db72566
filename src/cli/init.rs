use std::fs;

use crate::config::ServerConfig;
use crate::store::{SqliteStore, Store};

#[cfg(unix)]
fn set_group_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o770)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

/// Creates the data directories and the database schema. Safe to rerun.
pub fn run_init(config: &ServerConfig) -> anyhow::Result<()> {
    let text_root = config.text_storage_dir();
    for dir in [&config.data_dir, &text_root, &config.upload_dir()] {
        fs::create_dir_all(dir)?;
        #[cfg(unix)]
        set_group_permissions(dir);
    }

    let db_path = config.db_path();
    let store = SqliteStore::new(&db_path, &text_root)?;
    store.initialize()?;

    println!("Initialized database at {}", db_path.display());
    println!("Text storage at {}", text_root.display());

    Ok(())
}
