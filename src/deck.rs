//! The card catalog and the three-card spread.
//!
//! Draw order is meaningful: the first card drawn speaks for the past, the
//! second for the present, the third for the future. Nothing downstream may
//! re-sort a spread.

use rand::seq::index;
use rand::Rng;
use std::path::PathBuf;
use thiserror::Error;

/// Cards drawn per reading.
pub const SPREAD_SIZE: usize = 3;

/// One drawable card: display name plus its image file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub name: &'static str,
    pub image: &'static str,
}

/// The full deck: 22 major arcana and 14 minor arcana.
pub const CATALOG: &[Card] = &[
    // Major arcana
    Card { name: "The Fool", image: "fool.jpg" },
    Card { name: "The Magician", image: "magician.jpg" },
    Card { name: "The High Priestess", image: "high_priestess.jpg" },
    Card { name: "The Empress", image: "empress.jpg" },
    Card { name: "The Emperor", image: "emperor.jpg" },
    Card { name: "The Hierophant", image: "hierophant.jpg" },
    Card { name: "The Lovers", image: "lovers.jpg" },
    Card { name: "The Chariot", image: "chariot.jpg" },
    Card { name: "Strength", image: "strength.jpg" },
    Card { name: "The Hermit", image: "hermit.jpg" },
    Card { name: "Wheel of Fortune", image: "wheel_of_fortune.jpg" },
    Card { name: "Justice", image: "justice.jpg" },
    Card { name: "The Hanged Man", image: "hanged_man.jpg" },
    Card { name: "Death", image: "death.jpg" },
    Card { name: "Temperance", image: "temperance.jpg" },
    Card { name: "The Devil", image: "devil.jpg" },
    Card { name: "The Tower", image: "tower.jpg" },
    Card { name: "The Star", image: "star.jpg" },
    Card { name: "The Moon", image: "moon.jpg" },
    Card { name: "The Sun", image: "sun.jpg" },
    Card { name: "Judgement", image: "judgement.jpg" },
    Card { name: "The World", image: "world.jpg" },
    // Minor arcana
    Card { name: "Ace of Cups", image: "cups_ace.jpg" },
    Card { name: "Two of Wands", image: "wands_two.jpg" },
    Card { name: "Three of Swords", image: "swords_three.jpg" },
    Card { name: "Four of Pentacles", image: "pentacles_four.jpg" },
    Card { name: "Five of Wands", image: "wands_five.jpg" },
    Card { name: "Six of Cups", image: "cups_six.jpg" },
    Card { name: "Seven of Swords", image: "swords_seven.jpg" },
    Card { name: "Eight of Pentacles", image: "pentacles_eight.jpg" },
    Card { name: "Nine of Cups", image: "cups_nine.jpg" },
    Card { name: "Ten of Wands", image: "wands_ten.jpg" },
    Card { name: "Page of Cups", image: "cups_page.jpg" },
    Card { name: "Knight of Swords", image: "swords_knight.jpg" },
    Card { name: "Queen of Pentacles", image: "pentacles_queen.jpg" },
    Card { name: "King of Wands", image: "wands_king.jpg" },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("catalog holds {have} cards, a spread needs {need}")]
    CatalogTooSmall { have: usize, need: usize },
}

/// Position in a spread, assigned strictly by draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Past,
    Present,
    Future,
}

impl Role {
    pub const ALL: [Role; SPREAD_SIZE] = [Role::Past, Role::Present, Role::Future];

    /// Role-labeled caption shown with the card image.
    pub fn caption(self, card: &Card) -> String {
        match self {
            Role::Past => format!("\u{1f570} Past: {}", card.name),
            Role::Present => format!("\u{26a1} Present: {}", card.name),
            Role::Future => format!("\u{1f52e} Future: {}", card.name),
        }
    }
}

/// Exactly three pairwise-distinct cards in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spread {
    cards: [Card; SPREAD_SIZE],
}

impl Spread {
    /// Draw a spread without replacement from `catalog`.
    pub fn draw_from<R: Rng + ?Sized>(catalog: &[Card], rng: &mut R) -> Result<Spread, DeckError> {
        if catalog.len() < SPREAD_SIZE {
            return Err(DeckError::CatalogTooSmall {
                have: catalog.len(),
                need: SPREAD_SIZE,
            });
        }

        let picked = index::sample(rng, catalog.len(), SPREAD_SIZE);
        let mut cards = [catalog[0]; SPREAD_SIZE];
        for (slot, idx) in cards.iter_mut().zip(picked.iter()) {
            *slot = catalog[idx];
        }
        Ok(Spread { cards })
    }

    /// Draw from the full catalog with the thread-local RNG.
    pub fn draw() -> Result<Spread, DeckError> {
        Spread::draw_from(CATALOG, &mut rand::thread_rng())
    }

    /// Build a spread from known cards (tests, replay).
    #[allow(dead_code)] // Useful for tests
    pub fn from_cards(cards: [Card; SPREAD_SIZE]) -> Spread {
        Spread { cards }
    }

    pub fn cards(&self) -> &[Card; SPREAD_SIZE] {
        &self.cards
    }

    /// Cards paired with their draw-order roles.
    pub fn positions(&self) -> impl Iterator<Item = (Role, &Card)> {
        Role::ALL.into_iter().zip(self.cards.iter())
    }

    /// Card names in draw order, for logging.
    pub fn names(&self) -> Vec<String> {
        self.cards.iter().map(|c| c.name.to_string()).collect()
    }
}

/// Fails at startup when the configured catalog cannot cover a spread.
pub fn ensure_catalog() -> Result<(), DeckError> {
    if CATALOG.len() < SPREAD_SIZE {
        return Err(DeckError::CatalogTooSmall {
            have: CATALOG.len(),
            need: SPREAD_SIZE,
        });
    }
    Ok(())
}

/// Directory of card images; a missing file degrades to a text-only reveal.
#[derive(Debug, Clone)]
pub struct CardsDir {
    root: PathBuf,
}

impl CardsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, card: &Card) -> Option<PathBuf> {
        let path = self.root.join(card.image);
        path.is_file().then_some(path)
    }
}
