//! Error types for c2t.

use std::path::PathBuf;

/// Errors that end a sync run. The supervisor logs them and reconnects.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings file errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required setting: {0}")]
    MissingKey(&'static str),
}

/// IMAP errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Login failed for {username}: {source}")]
    Login {
        username: String,
        #[source]
        source: imap::error::Error,
    },

    #[error("IMAP error: {0}")]
    Imap(#[from] imap::error::Error),
}

/// Task board (Trello) errors.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
}

/// A raw message that cannot be turned into text.
#[derive(Debug, thiserror::Error)]
pub enum MalformedMessage {
    #[error("unparseable message: {0}")]
    Unparseable(#[from] mailparse::MailParseError),

    #[error("no non-attachment text part")]
    NoTextPart,
}

pub type Result<T> = std::result::Result<T, Error>;
