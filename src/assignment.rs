//! Google Classroom notification parsing.
//!
//! Classroom mails have no stable schema, so each field is recovered by a
//! small step that looks for the delimiters Classroom puts around it. Steps
//! run in order and any missing delimiter rejects the message, except the
//! due date which is optional.

use std::fmt;

use chrono::{Month, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::message::DecodedMessage;

pub const CLASSROOM_DOMAIN: &str = "classroom.google.com";

const SUBJECT_MARKERS: [&str; 2] = ["New assignment", "New material"];
const COURSE_URL: &str = "https://classroom.google.com/c/";
const COURSE_LINK: &str = "\n<https://classroom.google.com/c/";
const OPEN_LINKS: [&str; 2] = [
    "\nOPEN  \n<https://classroom.google.com/c/",
    "\nOpen  \n<https://classroom.google.com/c/",
];
const DETAILS_END: &str = "/details>\n";
const DUE_START: &str = ">.\n\n";
const DUE_PREFIXES: [&str; 2] = ["Due: ", "New assignment Due "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Assignment,
    Material,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Assignment => "assignment",
            Kind::Material => "material",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Draft,
    Created,
}

/// One classroom post, ready to become a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRecord {
    title: String,
    category_label: String,
    kind: Kind,
    due_date: Option<NaiveDate>,
    description: String,
    state: LifecycleState,
}

impl AssignmentRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category_label(&self) -> &str {
        &self.category_label
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Marks the record as posted to the board.
    pub fn created(self) -> Self {
        Self {
            state: LifecycleState::Created,
            ..self
        }
    }
}

/// Why a message is not a classroom notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("subject is not a new assignment or material")]
    Subject,

    #[error("sender is not a classroom address")]
    Sender,

    #[error("message is not multipart")]
    NotMultipart,

    #[error("unknown post kind in subject")]
    Kind,

    #[error("no quoted title in subject")]
    Title,

    #[error("no class name in body")]
    Category,

    #[error("no open link in body")]
    Url,

    #[error("title not found in body")]
    Description,
}

/// Builds an [`AssignmentRecord`] from a decoded classroom notification.
///
/// `current_year` anchors the due date, which classroom sends without a year.
pub fn extract(message: &DecodedMessage, current_year: i32) -> Result<AssignmentRecord, Rejection> {
    accept(message)?;
    info!(subject = %message.subject, "Generating card");

    let text = &message.body;
    debug!(%text, "notification text");

    let kind = kind(&message.subject).ok_or(Rejection::Kind)?;
    let raw_title = raw_title(&message.subject).ok_or(Rejection::Title)?;
    let title = clean_title(&raw_title).ok_or(Rejection::Title)?;
    let category_label = category_label(text, kind).ok_or(Rejection::Category)?;
    let url = url(text).ok_or(Rejection::Url)?;
    let excerpt = excerpt(text, &raw_title, &title).ok_or(Rejection::Description)?;

    let due_date = match kind {
        Kind::Assignment => due_date(text, &title, current_year),
        Kind::Material => None,
    };

    debug!(%kind, %title, %category_label, %url, ?due_date, "extracted");

    Ok(AssignmentRecord {
        title,
        category_label,
        kind,
        due_date,
        description: format!("{url}\n\n{excerpt}"),
        state: LifecycleState::Draft,
    })
}

fn accept(message: &DecodedMessage) -> Result<(), Rejection> {
    if !SUBJECT_MARKERS
        .iter()
        .any(|marker| message.subject.contains(marker))
    {
        return Err(Rejection::Subject);
    }

    if !message
        .sender
        .to_ascii_lowercase()
        .ends_with(CLASSROOM_DOMAIN)
    {
        return Err(Rejection::Sender);
    }

    if !message.multipart {
        return Err(Rejection::NotMultipart);
    }

    Ok(())
}

/// `New assignment: "…"` → `Assignment`.
fn kind(subject: &str) -> Option<Kind> {
    let token = subject.split(' ').nth(1)?.to_lowercase().replace(':', "");

    match token.as_str() {
        "assignment" => Some(Kind::Assignment),
        "material" => Some(Kind::Material),
        _ => None,
    }
}

/// The quoted part of the subject, with header folding undone.
fn raw_title(subject: &str) -> Option<String> {
    let start = subject.find('"')? + 1;
    let end = subject.rfind('"')?;
    let quoted = subject.get(start..end)?;

    Some(quoted.replace('\r', "").replace("\n ", "\n"))
}

fn clean_title(raw_title: &str) -> Option<String> {
    let title = raw_title.split_whitespace().collect::<Vec<_>>().join(" ");
    let title = title.strip_suffix(' ').unwrap_or(&title).to_owned();

    (!title.is_empty()).then_some(title)
}

/// Classroom writes "<teacher> posted a new <kind> in <class>" right before
/// the course link.
fn category_label(text: &str, kind: Kind) -> Option<String> {
    let intro = text.split(COURSE_LINK).next()?;
    let phrase = format!(" posted a new {kind} in ");

    intro
        .split(phrase.as_str())
        .nth(1)
        .filter(|label| !label.is_empty())
        .map(str::to_owned)
}

fn url(text: &str) -> Option<String> {
    let after = OPEN_LINKS
        .iter()
        .find_map(|marker| text.split(*marker).nth(1))?;
    let path = after.split(DETAILS_END).next()?;

    Some(format!("{COURSE_URL}{path}"))
}

/// Body text between the title and the open link.
fn excerpt<'a>(text: &'a str, raw_title: &str, title: &str) -> Option<&'a str> {
    let after = text
        .split(raw_title)
        .nth(1)
        .or_else(|| text.split(title).nth(1))?;

    Some(OPEN_LINKS.iter().fold(after, |rest, marker| {
        rest.split(*marker).next().unwrap_or(rest)
    }))
}

fn due_date(text: &str, title: &str, current_year: i32) -> Option<NaiveDate> {
    let after = text.split(DUE_START).nth(1)?;
    let token = after.split(format!("\n{title}").as_str()).next()?;
    let token = DUE_PREFIXES
        .iter()
        .fold(token.to_owned(), |token, prefix| token.replace(*prefix, ""));

    parse_due(&token, current_year)
}

/// Parses `Mar 5`. Classroom omits the year: January through August belong
/// to the second half of the school year, so they land in `current_year + 1`.
fn parse_due(token: &str, current_year: i32) -> Option<NaiveDate> {
    lazy_static! {
        static ref MONTH_DAY: Regex = Regex::new(r"^([A-Za-z]{3})\s+(\d{1,2})$").unwrap();
    }

    let caps = MONTH_DAY.captures(token)?;
    let month = caps[1].parse::<Month>().ok()?.number_from_month();
    let day: u32 = caps[2].parse().ok()?;
    let year = if month <= 8 {
        current_year + 1
    } else {
        current_year
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSIGNMENT_BODY: &str = "Ms. Rivera posted a new assignment in AP Biology\n\
        <https://classroom.google.com/c/NjQ1>.\n\
        \n\
        Due: Mar 5\n\
        Cell Respiration Lab\n\
        Measure CO2 output and upload your data table.\n\
        \n\
        OPEN  \n\
        <https://classroom.google.com/c/NjQ1/a/Nzg5/details>\n\
        \n\
        Google LLC\n";

    const MATERIAL_BODY: &str = "Mr. Okafor posted a new material in World History\n\
        <https://classroom.google.com/c/MTEx>.\n\
        \n\
        Unit 3 Reading\n\
        Chapters 4 and 5.\n\
        \n\
        Open  \n\
        <https://classroom.google.com/c/MTEx/m/MjIy/details>\n";

    fn notification(subject: &str, body: &str) -> DecodedMessage {
        DecodedMessage {
            subject: subject.to_owned(),
            sender: "no-reply@classroom.google.com".to_owned(),
            date: "Tue, 3 Sep 2024 10:00:00 +0000".to_owned(),
            multipart: true,
            body: body.to_owned(),
        }
    }

    fn assignment() -> DecodedMessage {
        notification("New assignment: \"Cell Respiration Lab\"", ASSIGNMENT_BODY)
    }

    #[test]
    fn full_assignment() {
        let record = extract(&assignment(), 2024).unwrap();

        assert_eq!(record.title(), "Cell Respiration Lab");
        assert_eq!(record.category_label(), "AP Biology");
        assert_eq!(record.kind(), Kind::Assignment);
        assert_eq!(record.due_date(), NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(
            record.description(),
            "https://classroom.google.com/c/NjQ1/a/Nzg5\n\n\
             \nMeasure CO2 output and upload your data table.\n"
        );
        assert_eq!(record.state(), LifecycleState::Draft);
    }

    #[test]
    fn full_material() {
        let message = notification("New material: \"Unit 3 Reading\"", MATERIAL_BODY);
        let record = extract(&message, 2024).unwrap();

        assert_eq!(record.title(), "Unit 3 Reading");
        assert_eq!(record.category_label(), "World History");
        assert_eq!(record.kind(), Kind::Material);
        assert_eq!(record.due_date(), None);
        assert_eq!(
            record.description(),
            "https://classroom.google.com/c/MTEx/m/MjIy\n\n\nChapters 4 and 5.\n"
        );
    }

    #[test]
    fn extraction_is_repeatable() {
        assert_eq!(extract(&assignment(), 2024), extract(&assignment(), 2024));
    }

    #[test]
    fn created_state() {
        let record = extract(&assignment(), 2024).unwrap().created();
        assert_eq!(record.state(), LifecycleState::Created);
    }

    #[test]
    fn title_collapsing() {
        let raw = raw_title("New Assignment: \"Essay   Draft\n 2\"").unwrap();
        assert_eq!(clean_title(&raw).as_deref(), Some("Essay Draft 2"));
    }

    #[test]
    fn title_folded_header() {
        let raw = raw_title("New assignment: \"Chapter 7\r\n review \"").unwrap();
        assert_eq!(raw, "Chapter 7\nreview ");
        assert_eq!(clean_title(&raw).as_deref(), Some("Chapter 7 review"));
    }

    #[test]
    fn title_keeps_inner_quotes() {
        let raw = raw_title("New assignment: \"Read \"Hamlet\" Act 1\"").unwrap();
        assert_eq!(raw, "Read \"Hamlet\" Act 1");
    }

    #[test]
    fn title_missing() {
        assert_eq!(raw_title("New assignment: Essay"), None);
        assert_eq!(raw_title("New assignment: \"Essay"), None);
        assert_eq!(clean_title("   "), None);
    }

    #[test]
    fn kind_token() {
        assert_eq!(kind("New assignment: \"x\""), Some(Kind::Assignment));
        assert_eq!(kind("New Material: \"x\""), Some(Kind::Material));
        assert_eq!(kind("New question: \"x\""), None);
        assert_eq!(kind("Hello"), None);
    }

    #[test]
    fn year_inference() {
        assert_eq!(parse_due("Mar 5", 2024), NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(parse_due("Oct 10", 2024), NaiveDate::from_ymd_opt(2024, 10, 10));
        assert_eq!(parse_due("Aug 31", 2024), NaiveDate::from_ymd_opt(2025, 8, 31));
        assert_eq!(parse_due("Sep 1", 2024), NaiveDate::from_ymd_opt(2024, 9, 1));
    }

    #[test]
    fn due_token_prefixes() {
        let text = "x>.\n\nNew assignment Due Oct 10\nEssay\n";
        assert_eq!(due_date(text, "Essay", 2024), NaiveDate::from_ymd_opt(2024, 10, 10));

        let text = "x>.\n\nDue: Mar 5\nEssay\n";
        assert_eq!(due_date(text, "Essay", 2024), NaiveDate::from_ymd_opt(2025, 3, 5));
    }

    #[test]
    fn unparseable_due_date_is_absent() {
        assert_eq!(parse_due("Smarch 5", 2024), None);
        assert_eq!(parse_due("Feb 30", 2024), None);
        assert_eq!(parse_due("tomorrow", 2024), None);
        assert_eq!(due_date("no marker here\nEssay", "Essay", 2024), None);

        let body = ASSIGNMENT_BODY.replace("Due: Mar 5\n", "No due date\n");
        let message = notification("New assignment: \"Cell Respiration Lab\"", &body);
        let record = extract(&message, 2024).unwrap();
        assert_eq!(record.due_date(), None);
    }

    #[test]
    fn both_open_casings() {
        assert_eq!(
            url(ASSIGNMENT_BODY).as_deref(),
            Some("https://classroom.google.com/c/NjQ1/a/Nzg5")
        );
        assert_eq!(
            url(MATERIAL_BODY).as_deref(),
            Some("https://classroom.google.com/c/MTEx/m/MjIy")
        );
        assert_eq!(url("no link"), None);
    }

    #[test]
    fn category_needs_phrase() {
        assert_eq!(
            category_label(ASSIGNMENT_BODY, Kind::Assignment).as_deref(),
            Some("AP Biology")
        );
        assert_eq!(category_label(ASSIGNMENT_BODY, Kind::Material), None);
    }

    #[test]
    fn excerpt_falls_back_to_clean_title() {
        let text = "Essay Draft 2\nWrite it.\nOPEN  \n<https://classroom.google.com/c/x/details>\n";
        assert_eq!(
            excerpt(text, "Essay   Draft\n2", "Essay Draft 2"),
            Some("\nWrite it.")
        );
        assert_eq!(excerpt(text, "Missing", "Also missing"), None);
    }

    #[test]
    fn rejects_other_subjects() {
        let message = notification("Re: lunch", ASSIGNMENT_BODY);
        assert_eq!(extract(&message, 2024), Err(Rejection::Subject));
    }

    #[test]
    fn rejects_other_senders() {
        let mut message = assignment();
        message.sender = "teacher@school.example".to_owned();
        assert_eq!(extract(&message, 2024), Err(Rejection::Sender));
    }

    #[test]
    fn rejects_single_part() {
        let mut message = assignment();
        message.multipart = false;
        assert_eq!(extract(&message, 2024), Err(Rejection::NotMultipart));
    }

    #[test]
    fn rejects_partial_bodies() {
        let body = ASSIGNMENT_BODY.replace("OPEN  \n", "");
        let message = notification("New assignment: \"Cell Respiration Lab\"", &body);
        assert_eq!(extract(&message, 2024), Err(Rejection::Url));

        let body = ASSIGNMENT_BODY.replace(" posted a new assignment in ", " shared ");
        let message = notification("New assignment: \"Cell Respiration Lab\"", &body);
        assert_eq!(extract(&message, 2024), Err(Rejection::Category));

        let message = notification("New assignment: \"Something else\"", ASSIGNMENT_BODY);
        assert_eq!(extract(&message, 2024), Err(Rejection::Description));
    }
}
