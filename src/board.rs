use std::collections::HashMap;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    assignment::{AssignmentRecord, Kind},
    error::BoardError,
};

/// Colours Trello accepts for labels.
pub const LABEL_COLORS: [&str; 10] = [
    "green", "yellow", "orange", "red", "purple", "blue", "sky", "lime", "pink", "black",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Label {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A card as sent to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub list_id: String,
    pub name: String,
    pub description: String,
    pub due: Option<NaiveDate>,
    pub label_id: String,
}

/// The remote board operations the sync loop needs.
pub trait BoardApi {
    fn labels(&self, board_id: &str) -> Result<Vec<Label>, BoardError>;
    fn create_label(&self, board_id: &str, name: &str, color: &str) -> Result<Label, BoardError>;
    fn create_card(&self, card: &NewCard) -> Result<(), BoardError>;
}

/// List ids cards are placed in, by post kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub assignments: String,
    pub materials: String,
}

impl Destinations {
    pub fn for_kind(&self, kind: Kind) -> &str {
        match kind {
            Kind::Assignment => &self.assignments,
            Kind::Material => &self.materials,
        }
    }
}

/// Label name to label id. Names match exactly, case included.
#[derive(Debug, Default)]
pub struct LabelCache {
    ids: HashMap<String, String>,
}

impl LabelCache {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: String, id: String) {
        self.ids.insert(name, id);
    }

    pub fn replace_all(&mut self, labels: Vec<Label>) {
        self.ids = labels.into_iter().map(|label| (label.name, label.id)).collect();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Creates cards on one board, creating labels as they are first needed.
pub struct BoardClient<A> {
    api: A,
    board_id: String,
    destinations: Destinations,
    labels: LabelCache,
}

impl<A: BoardApi> BoardClient<A> {
    pub fn new(api: A, board_id: String, destinations: Destinations) -> Self {
        Self {
            api,
            board_id,
            destinations,
            labels: LabelCache::default(),
        }
    }

    /// Reloads the label cache from the board, dropping whatever was cached.
    pub fn refresh_labels(&mut self) -> Result<(), BoardError> {
        let labels = self.api.labels(&self.board_id)?;
        self.labels.replace_all(labels);
        debug!(count = self.labels.len(), "fetched labels");
        Ok(())
    }

    pub fn resolve_label(&mut self, name: &str) -> Result<String, BoardError> {
        if let Some(id) = self.labels.get(name) {
            return Ok(id.to_owned());
        }

        let color = LABEL_COLORS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(LABEL_COLORS[0]);

        info!(label = name, color, "Creating missing label");
        let label = self.api.create_label(&self.board_id, name, color)?;
        self.labels.insert(name.to_owned(), label.id.clone());
        Ok(label.id)
    }

    /// Posts `record` as a card and returns it marked as created.
    ///
    /// A label created here is kept even if the card itself fails.
    pub fn create_card(&mut self, record: AssignmentRecord) -> Result<AssignmentRecord, BoardError> {
        let label_id = self.resolve_label(record.category_label())?;

        let card = NewCard {
            list_id: self.destinations.for_kind(record.kind()).to_owned(),
            name: record.title().to_owned(),
            description: record.description().to_owned(),
            due: record.due_date(),
            label_id,
        };

        self.api.create_card(&card)?;
        info!(title = record.title(), kind = %record.kind(), "Created card");
        Ok(record.created())
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }
}
