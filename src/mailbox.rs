use std::net::TcpStream;

use imap::Session;
use native_tls::{TlsConnector, TlsStream};
use tracing::debug;

use crate::error::MailboxError;

const IMAP_PORT: u16 = 993;
const INBOX: &str = "INBOX";

/// The mailbox operations the sync loop needs.
pub trait Mailbox {
    /// Sequence number of the newest message in the inbox.
    fn high_water_mark(&mut self) -> Result<u32, MailboxError>;

    /// Raw RFC 822 bytes of message `seq`, without marking it as read.
    fn fetch(&mut self, seq: u32) -> Result<Option<Vec<u8>>, MailboxError>;

    /// Blocks until the server reports a change to the inbox.
    fn wait_for_new_mail(&mut self) -> Result<(), MailboxError>;
}

pub struct ImapMailbox {
    session: Session<TlsStream<TcpStream>>,
}

impl ImapMailbox {
    pub fn connect(host: &str, username: &str, password: &str) -> Result<Self, MailboxError> {
        let tls = TlsConnector::builder().build()?;

        // We pass in the domain twice to check that the server's TLS
        // certificate is valid for the domain we're connecting to.
        let client = imap::connect((host, IMAP_PORT), host, &tls)?;

        let mut session =
            client
                .login(username, password)
                .map_err(|(source, _client)| MailboxError::Login {
                    username: username.to_owned(),
                    source,
                })?;

        session.select(INBOX)?;
        debug!(host, username, "IMAP session open");

        Ok(Self { session })
    }
}

impl Mailbox for ImapMailbox {
    fn high_water_mark(&mut self) -> Result<u32, MailboxError> {
        Ok(self.session.select(INBOX)?.exists)
    }

    fn fetch(&mut self, seq: u32) -> Result<Option<Vec<u8>>, MailboxError> {
        let messages = self.session.fetch(seq.to_string(), "BODY.PEEK[]")?;

        Ok(messages
            .iter()
            .next()
            .and_then(|message| message.body())
            .map(<[u8]>::to_vec))
    }

    fn wait_for_new_mail(&mut self) -> Result<(), MailboxError> {
        self.session.idle()?.wait_keepalive()?;
        Ok(())
    }
}

impl Drop for ImapMailbox {
    fn drop(&mut self) {
        // Be nice to the server and log out.
        let _ = self.session.logout();
    }
}
