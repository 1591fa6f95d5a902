use clap::Parser;
use std::path::PathBuf;

/// Server settings, read from the command line or the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "website", about = "Data Sweeper and Post Board web server")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "SWEEPER_ADDR", default_value = "127.0.0.1:3000")]
    pub addr: String,

    /// JSON file holding the post board
    #[arg(long, env = "SWEEPER_POSTS_FILE", default_value = "database/posts.json")]
    pub posts_file: PathBuf,

    /// Directory for images attached to posts
    #[arg(long, env = "SWEEPER_UPLOADS_DIR", default_value = "database/uploads")]
    pub uploads_dir: PathBuf,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "SWEEPER_MAX_UPLOAD_MB", default_value_t = 200)]
    pub max_upload_mb: usize,

    /// Rows shown in each uploaded file's preview
    #[arg(long, env = "SWEEPER_PREVIEW_ROWS", default_value_t = 5)]
    pub preview_rows: usize,
}

impl Config {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: "127.0.0.1:3000".to_string(),
            posts_file: PathBuf::from("database/posts.json"),
            uploads_dir: PathBuf::from("database/uploads"),
            max_upload_mb: 200,
            preview_rows: 5,
        }
    }
}
