use std::sync::Arc;

use crate::services::CardService;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub cards: Arc<CardService>,
}

impl AppState {
    pub fn new(cards: CardService) -> Self {
        Self {
            cards: Arc::new(cards),
        }
    }
}
