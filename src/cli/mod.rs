mod annotation;
mod commands;
mod init;
mod study;
mod user;

pub use annotation::{run_annotation_dump, write_annotations};
pub use commands::{AnnotationCommands, StudyCommands, UserCommands};
pub use init::run_init;
pub use study::{run_study_dump, write_study_events};
pub use user::run_user_add;

use crate::config::ServerConfig;
use crate::store::SqliteStore;

/// Opens the store under the configured data dir, checking it was initialized.
pub fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'entities init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path, config.text_storage_dir()).map_err(Into::into)
}
