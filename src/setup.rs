use std::path::Path;

use tracing::{info, warn};

use crate::{
    error::{BoardError, Error, MailboxError, Result},
    mailbox::ImapMailbox,
    read_line::{choose, ReadLine},
    settings::Settings,
    trello::{Named, TrelloApi},
};

const KEY_URL: &str = "https://trello.com/app-key";

/// Interactive first run: asks for credentials, checks them, lets the user
/// pick a board and two lists, and writes the settings file.
pub fn initialize(path: &Path, imap_host: &str) -> Result<Settings> {
    println!(
        "No settings found or file invalid, initializing...\n\
         You can change these settings at any time in {path}, or restart this \
         process by deleting it.",
        path = path.display()
    );

    let (username, password) = mail_login(imap_host)?;
    let (api, trello_key, trello_token) = trello_login()?;

    let boards = api.boards()?;
    let board = pick(&boards, "Select which board you would like to use")?;

    let lists = api.lists(&board.id)?;
    let assignments = pick(&lists, "Select which list you would like to use for assignments")?;
    let materials = pick(&lists, "Select which list you would like to use for materials")?;

    let settings = Settings::new(
        path,
        username,
        password,
        trello_key,
        trello_token,
        board.id.clone(),
        assignments.id.clone(),
        materials.id.clone(),
    );
    settings.save()?;

    info!(path = %path.display(), board = %board.name, "Successfully initialized settings!");
    Ok(settings)
}

fn mail_login(imap_host: &str) -> Result<(String, String)> {
    let mut username = ReadLine::new("Email address").get()?;

    loop {
        let password = ReadLine::new("Email password").get()?;

        match ImapMailbox::connect(imap_host, &username, &password) {
            Ok(_) => return Ok((username, password)),
            Err(err @ MailboxError::Login { .. }) => {
                warn!(error = %err, "Invalid email credentials");
                println!("Invalid email credentials. Please try again.");
                username = ReadLine::new("Email address").default(username).get()?;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn trello_login() -> Result<(TrelloApi, String, String)> {
    let mut key = ReadLine::new(&format!("Go to {KEY_URL} and paste the key here")).get()?;
    let mut token = ReadLine::new(&token_prompt(&key, "")).get()?;

    loop {
        let api = TrelloApi::new(&key, &token)?;

        match api.verify() {
            Ok(()) => return Ok((api, key, token)),
            Err(BoardError::Status { body, .. }) if body.contains("invalid key") => {
                key = ReadLine::new(&format!(
                    "Go to {KEY_URL} and paste the key here. The previous key was incorrect or invalid"
                ))
                .get()?;
            }
            Err(BoardError::Status { body, .. }) if body.contains("invalid token") => {
                token = ReadLine::new(&token_prompt(
                    &key,
                    ". The previous token was incorrect or invalid",
                ))
                .get()?;
            }
            Err(err) => return Err(Error::Board(err)),
        }
    }
}

fn token_prompt(key: &str, suffix: &str) -> String {
    format!(
        "Go to https://trello.com/1/authorize?name=ClassroomToTrello&scope=read,write\
         &response_type=token&key={key}, allow access, and paste the token here{suffix}"
    )
}

fn pick<'a>(items: &'a [Named], prompt: &str) -> Result<&'a Named> {
    let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
    if names.is_empty() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "nothing to choose from",
        )));
    }

    Ok(&items[choose(prompt, &names)?])
}
