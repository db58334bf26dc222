use base64::{engine::general_purpose::STANDARD, Engine as _};
use mailparse::{DispositionType, MailAddr, MailHeaderMap, ParsedMail};

use crate::error::MalformedMessage;

/// A mailbox message reduced to the fields the extractor looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub multipart: bool,
    pub body: String,
}

/// Turns raw RFC 822 bytes into a [`DecodedMessage`].
///
/// The body is the first part not marked as an attachment. Some notifications
/// arrive base64 encoded without saying so, so the body is base64 decoded
/// whenever that yields valid UTF-8.
pub fn decode(raw: &[u8]) -> Result<DecodedMessage, MalformedMessage> {
    let mail = mailparse::parse_mail(raw)?;

    let header = |key: &str| mail.headers.get_first_value(key).unwrap_or_default();

    let part = first_text_part(&mail).ok_or(MalformedMessage::NoTextPart)?;
    let text = part.get_body()?;

    Ok(DecodedMessage {
        subject: header("Subject"),
        sender: sender_address(&header("From")),
        date: header("Date"),
        multipart: !mail.subparts.is_empty(),
        body: undisguise_base64(text).replace('\r', ""),
    })
}

fn first_text_part<'a>(mail: &'a ParsedMail<'a>) -> Option<&'a ParsedMail<'a>> {
    if mail.get_content_disposition().disposition == DispositionType::Attachment {
        return None;
    }

    if mail.subparts.is_empty() {
        return Some(mail);
    }

    mail.subparts.iter().find_map(first_text_part)
}

fn undisguise_base64(text: String) -> String {
    let compact: String = text.chars().filter(|c| *c != '\r' && *c != '\n').collect();

    match STANDARD.decode(compact.trim()) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or(text),
        Err(_) => text,
    }
}

fn sender_address(from: &str) -> String {
    let parsed = mailparse::addrparse(from).ok().and_then(|list| {
        list.iter().find_map(|addr| match addr {
            MailAddr::Single(info) => Some(info.addr.clone()),
            MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
        })
    });

    parsed.unwrap_or_else(|| from.trim().trim_end_matches('>').to_owned())
}
