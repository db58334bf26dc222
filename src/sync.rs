//! The mailbox-to-board loop.
//!
//! The cursor is the highest sequence number already handled. It is saved
//! before each message is fetched, so a restart never sees a message twice.
//! Rejected and failed messages count as handled; nothing is retried.

use std::{thread, time::Duration};

use chrono::{Datelike, Local};
use tracing::{debug, error, info, warn};

use crate::{
    assignment::{self, AssignmentRecord},
    board::{BoardApi, BoardClient},
    error::{Result, SettingsError},
    mailbox::Mailbox,
    message,
    settings::Settings,
};

/// Pause after every message, for the board's rate limit.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_millis(500);

/// Pause before reconnecting after a failed run.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Durable storage for the cursor.
pub trait CursorStore {
    fn load_cursor(&self) -> u32;
    fn save_cursor(&mut self, position: u32) -> std::result::Result<(), SettingsError>;
}

impl CursorStore for Settings {
    fn load_cursor(&self) -> u32 {
        self.latest_checked_email_num
    }

    fn save_cursor(&mut self, position: u32) -> std::result::Result<(), SettingsError> {
        self.latest_checked_email_num = position;
        self.save()
    }
}

pub struct SyncCursor<S> {
    store: S,
    position: u32,
}

impl<S: CursorStore> SyncCursor<S> {
    pub fn new(store: S) -> Self {
        let position = store.load_cursor();
        Self { store, position }
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    /// Persists `seq` as handled. Never moves backwards.
    pub fn advance_to(&mut self, seq: u32) -> std::result::Result<(), SettingsError> {
        if seq <= self.position {
            return Ok(());
        }

        self.store.save_cursor(seq)?;
        self.position = seq;
        Ok(())
    }
}

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(AssignmentRecord),
    Ignored,
    Malformed,
    Missing,
    Failed,
}

pub struct SyncLoop<A, S> {
    board: BoardClient<A>,
    cursor: SyncCursor<S>,
    delay: Duration,
}

impl<A: BoardApi, S: CursorStore> SyncLoop<A, S> {
    pub fn new(board: BoardClient<A>, cursor: SyncCursor<S>, delay: Duration) -> Self {
        Self {
            board,
            cursor,
            delay,
        }
    }

    pub fn cursor(&self) -> u32 {
        self.cursor.position()
    }

    /// Runs until an error ends the run: catch up on the backlog, then wait
    /// for new mail forever.
    pub fn run<M: Mailbox>(&mut self, mailbox: &mut M) -> Result<()> {
        info!(cursor = self.cursor(), "Starting!");
        self.board.refresh_labels()?;

        self.catch_up(mailbox)?;

        loop {
            mailbox.wait_for_new_mail()?;
            debug!("mailbox changed");
            self.catch_up(mailbox)?;
        }
    }

    /// Handles every message after the cursor up to the current newest one.
    pub fn catch_up<M: Mailbox>(&mut self, mailbox: &mut M) -> Result<()> {
        let latest = mailbox.high_water_mark()?;
        if latest > self.cursor() {
            info!(latest, cursor = self.cursor(), "Latest message in inbox");
        } else if latest < self.cursor() {
            warn!(
                latest,
                cursor = self.cursor(),
                "Inbox shrank below the cursor; messages at or below it are skipped"
            );
        }

        let mut created = 0;
        while self.cursor() < latest {
            let seq = self.cursor() + 1;
            if let Outcome::Created(record) = self.process(mailbox, seq)? {
                debug!(seq, title = record.title(), state = ?record.state(), "card posted");
                created += 1;
            }
        }

        if created > 0 {
            info!(created, cursor = self.cursor(), "Caught up");
        }
        Ok(())
    }

    /// Handles message `seq`. Only mailbox and cursor errors are returned;
    /// everything about the message itself is logged and absorbed.
    pub fn process<M: Mailbox>(&mut self, mailbox: &mut M, seq: u32) -> Result<Outcome> {
        self.cursor.advance_to(seq)?;

        let outcome = match mailbox.fetch(seq)? {
            Some(raw) => self.handle(seq, &raw),
            None => {
                warn!(seq, "message not returned by server");
                Outcome::Missing
            }
        };

        thread::sleep(self.delay);
        Ok(outcome)
    }

    fn handle(&mut self, seq: u32, raw: &[u8]) -> Outcome {
        let message = match message::decode(raw) {
            Ok(message) => message,
            Err(err) => {
                info!(seq, error = %err, "IGNORED: malformed message");
                return Outcome::Malformed;
            }
        };

        let record = match assignment::extract(&message, Local::now().year()) {
            Ok(record) => record,
            Err(reason) => {
                info!(
                    seq, %reason,
                    "IGNORED: Subject: {:?} | Received: {}", message.subject, message.date
                );
                return Outcome::Ignored;
            }
        };

        match self.board.create_card(record) {
            Ok(record) => Outcome::Created(record),
            Err(err) => {
                error!(seq, subject = %message.subject, error = %err, "Card creation failed");
                Outcome::Failed
            }
        }
    }

    /// Reconnects and reruns forever. Each run resumes from the saved cursor.
    pub fn run_forever<M, C>(&mut self, mut connect: C, reconnect_delay: Duration) -> !
    where
        M: Mailbox,
        C: FnMut() -> Result<M>,
    {
        loop {
            let result = connect().and_then(|mut mailbox| self.run(&mut mailbox));

            if let Err(err) = result {
                error!(error = %err, cursor = self.cursor(), "Sync loop failed, restarting");
            }

            thread::sleep(reconnect_delay);
        }
    }
}
