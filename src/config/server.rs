use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Root of the content-addressed text tree. Defaults to `<data_dir>/texts`.
    pub text_storage: Option<PathBuf>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("entities.db")
    }

    #[must_use]
    pub fn text_storage_dir(&self) -> PathBuf {
        self.text_storage
            .clone()
            .unwrap_or_else(|| self.data_dir.join("texts"))
    }

    /// Where multipart uploads are spooled before they are hashed and placed.
    /// Kept under the data dir so placement is usually a plain rename.
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("tmp")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            text_storage: None,
        }
    }
}
