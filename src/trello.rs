use std::time::Duration;

use reqwest::{
    blocking::{Client, Response},
    StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    board::{BoardApi, Label, NewCard},
    error::BoardError,
};

const API_URL: &str = "https://api.trello.com/1";
const TIMEOUT: Duration = Duration::from_secs(30);

/// A board or list, as offered during setup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Named {
    pub id: String,
    pub name: String,
}

/// Trello REST client. Every request carries the key and token as query
/// parameters.
pub struct TrelloApi {
    http: Client,
    key: String,
    token: String,
}

impl TrelloApi {
    pub fn new(key: &str, token: &str) -> Result<Self, BoardError> {
        let http = Client::builder().timeout(TIMEOUT).build()?;

        Ok(Self {
            http,
            key: key.to_owned(),
            token: token.to_owned(),
        })
    }

    /// Checks the key and token by fetching the current member.
    pub fn verify(&self) -> Result<(), BoardError> {
        self.get::<serde_json::Value>("members/me").map(|_| ())
    }

    pub fn boards(&self) -> Result<Vec<Named>, BoardError> {
        self.get("members/me/boards?fields=name")
    }

    pub fn lists(&self, board_id: &str) -> Result<Vec<Named>, BoardError> {
        self.get(&format!("boards/{board_id}/lists"))
    }

    fn auth(&self) -> [(&str, &str); 2] {
        [("key", self.key.as_str()), ("token", self.token.as_str())]
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BoardError> {
        let response = self
            .http
            .get(format!("{API_URL}/{path}"))
            .query(&self.auth())
            .send()?;

        Ok(check(path, response)?.json()?)
    }

    fn post<F: Serialize + ?Sized>(&self, path: &str, form: &F) -> Result<Response, BoardError> {
        let response = self
            .http
            .post(format!("{API_URL}/{path}"))
            .query(&self.auth())
            .form(form)
            .send()?;

        check(path, response)
    }
}

fn check(endpoint: &str, response: Response) -> Result<Response, BoardError> {
    let status = response.status();
    if !is_failure(status) {
        return Ok(response);
    }

    Err(BoardError::Status {
        endpoint: endpoint.to_owned(),
        status: status.as_u16(),
        body: response.text().unwrap_or_default(),
    })
}

/// Any status of 400 or above is a failure.
fn is_failure(status: StatusCode) -> bool {
    status.as_u16() >= 400
}

/// Form fields for a new card. `due` is only sent when the card has one.
fn card_form(card: &NewCard) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("idList", card.list_id.clone()),
        ("name", card.name.clone()),
        ("desc", card.description.clone()),
        ("idLabels", card.label_id.clone()),
    ];
    if let Some(due) = card.due {
        form.push(("due", due.format("%Y-%m-%d").to_string()));
    }

    form
}

impl BoardApi for TrelloApi {
    fn labels(&self, board_id: &str) -> Result<Vec<Label>, BoardError> {
        self.get(&format!("boards/{board_id}/labels"))
    }

    fn create_label(&self, board_id: &str, name: &str, color: &str) -> Result<Label, BoardError> {
        let path = format!("boards/{board_id}/labels");
        Ok(self.post(&path, &[("name", name), ("color", color)])?.json()?)
    }

    fn create_card(&self, card: &NewCard) -> Result<(), BoardError> {
        self.post("cards", &card_form(card)).map(|_| ())
    }
}
