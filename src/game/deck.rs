//! Deck construction and match resolution for the memory board.
//!
//! Everything here is pure: the glue passes in a seeded generator and gets
//! back a dealt deck, then feeds reveals through the state machine one click
//! at a time. A dealt deck always contains every chosen face exactly
//! `match_size` times, so the win condition is simply "no hidden tiles
//! left".

use std::fmt;

/// Board shape and how many identical faces make a match.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckConfig {
    pub cols: u8,
    pub rows: u8,
    pub match_size: u8,
}

impl Default for DeckConfig {
    fn default() -> Self {
        // 4x4 pairs, the classic layout.
        Self {
            cols: 4,
            rows: 4,
            match_size: 2,
        }
    }
}

impl DeckConfig {
    pub fn tile_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Flat row-major index for a grid position.
    pub fn index(&self, col: u8, row: u8) -> usize {
        row as usize * self.cols as usize + col as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Hidden,
    Revealed,
    Matched,
}

/// One card on the board. `face` indexes the image manifest.
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    pub face: usize,
    pub state: TileState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckError {
    MatchSizeTooSmall(u8),
    UnevenGrid { tiles: usize, match_size: u8 },
    NotEnoughFaces { needed: usize, available: usize },
}

impl fmt::Display for DeckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckError::MatchSizeTooSmall(n) => {
                write!(f, "match size {n} is too small (minimum 2)")
            }
            DeckError::UnevenGrid { tiles, match_size } => {
                write!(f, "{tiles} tiles cannot be split into sets of {match_size}")
            }
            DeckError::NotEnoughFaces { needed, available } => {
                write!(f, "deck needs {needed} faces but only {available} are available")
            }
        }
    }
}

/// Linear congruential generator used for dealing.
///
/// Same multiplier/increment family as the classic Numerical Recipes
/// constants; not crypto secure, but reproducible per seed, which is what
/// the deck wants.
#[derive(Debug, Clone, Copy)]
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(1664525).wrapping_add(1013904223);
        self.0
    }

    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            (self.next() % len as u64) as usize
        }
    }
}

/// What a single reveal did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Click had no effect (out of range, tile already face-up or matched,
    /// or a mismatched set is still on display).
    Ignored,
    /// Tile turned face-up; the current set is not full yet.
    Revealed,
    /// The set filled with identical faces and was locked in.
    Matched { face: usize },
    /// The set filled with differing faces; tiles stay face-up until
    /// `conceal_unmatched` runs.
    Mismatched,
}

/// Runtime deck state: tiles plus the currently face-up (unmatched) set.
#[derive(Debug)]
pub struct Deck {
    config: DeckConfig,
    tiles: Vec<Tile>,
    face_up: Vec<usize>,
}

impl Deck {
    /// Deals a shuffled deck. Picks `tile_count / match_size` distinct faces
    /// out of `available_faces`, repeats each `match_size` times, and
    /// shuffles with the supplied generator.
    pub fn deal(config: DeckConfig, available_faces: usize, rng: &mut Lcg) -> Result<Self, DeckError> {
        if config.match_size < 2 {
            return Err(DeckError::MatchSizeTooSmall(config.match_size));
        }
        let tiles = config.tile_count();
        if tiles == 0 || tiles % config.match_size as usize != 0 {
            return Err(DeckError::UnevenGrid {
                tiles,
                match_size: config.match_size,
            });
        }
        let needed = tiles / config.match_size as usize;
        if needed > available_faces {
            return Err(DeckError::NotEnoughFaces {
                needed,
                available: available_faces,
            });
        }

        // Partial Fisher-Yates over the face pool picks `needed` distinct faces.
        let mut pool: Vec<usize> = (0..available_faces).collect();
        for i in 0..needed {
            let j = i + rng.next_index(pool.len() - i);
            pool.swap(i, j);
        }

        let mut faces: Vec<usize> = Vec::with_capacity(tiles);
        for &face in &pool[..needed] {
            for _ in 0..config.match_size {
                faces.push(face);
            }
        }
        for i in (1..faces.len()).rev() {
            let j = rng.next_index(i + 1);
            faces.swap(i, j);
        }

        let tiles = faces
            .into_iter()
            .map(|face| Tile {
                face,
                state: TileState::Hidden,
            })
            .collect();
        Ok(Self {
            config,
            tiles,
            face_up: Vec::new(),
        })
    }

    pub fn config(&self) -> DeckConfig {
        self.config
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// True while a full mismatched set is face-up waiting to be concealed.
    pub fn conceal_pending(&self) -> bool {
        self.face_up.len() == self.config.match_size as usize
    }

    pub fn all_matched(&self) -> bool {
        self.tiles.iter().all(|t| t.state == TileState::Matched)
    }

    /// Matched sets locked in so far.
    pub fn matched_sets(&self) -> usize {
        let per_set = self.config.match_size as usize;
        self.tiles
            .iter()
            .filter(|t| t.state == TileState::Matched)
            .count()
            / per_set
    }

    pub fn total_sets(&self) -> usize {
        self.config.tile_count() / self.config.match_size as usize
    }

    /// Turns one tile face-up and resolves the set once it fills.
    pub fn reveal(&mut self, index: usize) -> RevealOutcome {
        if self.conceal_pending() {
            return RevealOutcome::Ignored;
        }
        let Some(tile) = self.tiles.get_mut(index) else {
            return RevealOutcome::Ignored;
        };
        if tile.state != TileState::Hidden {
            return RevealOutcome::Ignored;
        }

        tile.state = TileState::Revealed;
        self.face_up.push(index);
        if self.face_up.len() < self.config.match_size as usize {
            return RevealOutcome::Revealed;
        }

        let face = self.tiles[self.face_up[0]].face;
        if self.face_up.iter().all(|&i| self.tiles[i].face == face) {
            for &i in &self.face_up {
                self.tiles[i].state = TileState::Matched;
            }
            self.face_up.clear();
            RevealOutcome::Matched { face }
        } else {
            RevealOutcome::Mismatched
        }
    }

    /// Flips the mismatched set back face-down.
    pub fn conceal_unmatched(&mut self) {
        for index in self.face_up.drain(..) {
            self.tiles[index].state = TileState::Hidden;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcg_is_reproducible() {
        let mut a = Lcg::new(7);
        let mut b = Lcg::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_index(1000), b.next_index(1000));
        }
    }

    #[test]
    fn deal_rejects_bad_configs() {
        let mut rng = Lcg::new(1);
        let lopsided = DeckConfig {
            cols: 3,
            rows: 3,
            match_size: 2,
        };
        assert_eq!(
            Deck::deal(lopsided, 8, &mut rng).unwrap_err(),
            DeckError::UnevenGrid {
                tiles: 9,
                match_size: 2
            }
        );
        let tiny = DeckConfig {
            cols: 4,
            rows: 4,
            match_size: 1,
        };
        assert_eq!(
            Deck::deal(tiny, 8, &mut rng).unwrap_err(),
            DeckError::MatchSizeTooSmall(1)
        );
        let starved = DeckConfig::default();
        assert_eq!(
            Deck::deal(starved, 5, &mut rng).unwrap_err(),
            DeckError::NotEnoughFaces {
                needed: 8,
                available: 5
            }
        );
    }

    #[test]
    fn mismatch_blocks_reveals_until_concealed() {
        let mut rng = Lcg::new(3);
        let mut deck = Deck::deal(DeckConfig::default(), 8, &mut rng).unwrap();
        // Find two tiles with different faces.
        let a = 0;
        let b = (1..deck.tiles().len())
            .find(|&i| deck.tiles()[i].face != deck.tiles()[a].face)
            .unwrap();
        assert_eq!(deck.reveal(a), RevealOutcome::Revealed);
        assert_eq!(deck.reveal(b), RevealOutcome::Mismatched);
        assert!(deck.conceal_pending());
        let c = (0..deck.tiles().len())
            .find(|&i| deck.tiles()[i].state == TileState::Hidden)
            .unwrap();
        assert_eq!(deck.reveal(c), RevealOutcome::Ignored);
        deck.conceal_unmatched();
        assert!(!deck.conceal_pending());
        assert_eq!(deck.reveal(c), RevealOutcome::Revealed);
    }
}
