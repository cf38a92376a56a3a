use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
