mod assignment;
mod board;
mod error;
mod logging;
mod mailbox;
mod message;
mod read_line;
mod settings;
mod setup;
mod sync;
mod trello;

use std::{
    env,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    board::BoardClient,
    error::Error,
    mailbox::ImapMailbox,
    settings::Settings,
    sync::{SyncCursor, SyncLoop, RATE_LIMIT_DELAY, RECONNECT_DELAY},
    trello::TrelloApi,
};

const DEFAULT_IMAP_HOST: &str = "imap.gmail.com";
const DEFAULT_CONFIG: &str = "config.json";
const LOG_FILE: &str = "ClassroomToTrello.log";

fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init(Path::new("."), LOG_FILE);

    let imap_host = env::var("C2T_IMAP_HOST").unwrap_or_else(|_| DEFAULT_IMAP_HOST.to_owned());
    let config = env::var("C2T_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG));

    let settings = match Settings::load(&config) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "No usable settings");
            setup::initialize(&config, &imap_host)?
        }
    };

    let username = settings.username.clone();
    let password = settings.password.clone();

    let api = TrelloApi::new(&settings.trello_key, &settings.trello_token)?;
    let board = BoardClient::new(api, settings.board_id.clone(), settings.destinations());
    let mut sync = SyncLoop::new(board, SyncCursor::new(settings), RATE_LIMIT_DELAY);

    info!(host = %imap_host, user = %username, "Watching inbox");

    sync.run_forever(
        || ImapMailbox::connect(&imap_host, &username, &password).map_err(Error::from),
        RECONNECT_DELAY,
    )
}
