// Integration tests for deck invariants and the public tile manifest.
// These tests are native-friendly and avoid wasm/browser APIs.

use std::collections::{HashMap, HashSet};

use memotile::TILE_IMAGES;
use memotile::game::deck::{Deck, DeckConfig, DeckError, Lcg, RevealOutcome, TileState};

#[test]
fn tile_manifest_is_nonempty_and_unique() {
    assert!(!TILE_IMAGES.is_empty());
    let mut seen = HashSet::new();
    for path in TILE_IMAGES {
        assert!(seen.insert(*path), "duplicate manifest entry '{}'", path);
        assert!(path.ends_with(".png"), "unexpected extension in '{}'", path);
    }
}

#[test]
fn manifest_covers_the_default_layout() {
    let config = DeckConfig::default();
    let needed = config.tile_count() / config.match_size as usize;
    assert!(
        TILE_IMAGES.len() >= needed,
        "manifest has {} faces, default layout needs {}",
        TILE_IMAGES.len(),
        needed
    );
}

#[test]
fn dealt_deck_has_every_face_exactly_match_size_times() {
    for match_size in [2u8, 3] {
        let config = DeckConfig {
            cols: 6,
            rows: 4,
            match_size,
        };
        let mut rng = Lcg::new(42);
        let deck = Deck::deal(config, TILE_IMAGES.len(), &mut rng).unwrap();
        assert_eq!(deck.tiles().len(), 24);
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for tile in deck.tiles() {
            assert!(tile.face < TILE_IMAGES.len());
            assert_eq!(tile.state, TileState::Hidden);
            *counts.entry(tile.face).or_default() += 1;
        }
        assert_eq!(counts.len(), 24 / match_size as usize);
        assert!(counts.values().all(|&c| c == match_size as usize));
    }
}

#[test]
fn same_seed_deals_the_same_board() {
    let config = DeckConfig::default();
    let mut a = Lcg::new(99);
    let mut b = Lcg::new(99);
    let first = Deck::deal(config, TILE_IMAGES.len(), &mut a).unwrap();
    let second = Deck::deal(config, TILE_IMAGES.len(), &mut b).unwrap();
    let faces_a: Vec<usize> = first.tiles().iter().map(|t| t.face).collect();
    let faces_b: Vec<usize> = second.tiles().iter().map(|t| t.face).collect();
    assert_eq!(faces_a, faces_b);
}

#[test]
fn pair_flow_matches_and_wins() {
    let config = DeckConfig {
        cols: 2,
        rows: 1,
        match_size: 2,
    };
    let mut rng = Lcg::new(5);
    let mut deck = Deck::deal(config, TILE_IMAGES.len(), &mut rng).unwrap();
    assert_eq!(deck.reveal(0), RevealOutcome::Revealed);
    // Clicking a face-up tile does nothing.
    assert_eq!(deck.reveal(0), RevealOutcome::Ignored);
    let face = deck.tiles()[0].face;
    assert_eq!(deck.reveal(1), RevealOutcome::Matched { face });
    assert!(deck.all_matched());
    assert_eq!(deck.matched_sets(), 1);
    assert_eq!(deck.reveal(1), RevealOutcome::Ignored);
}

#[test]
fn triple_mismatch_conceals_back_to_hidden() {
    let config = DeckConfig {
        cols: 3,
        rows: 2,
        match_size: 3,
    };
    let mut rng = Lcg::new(8);
    let mut deck = Deck::deal(config, TILE_IMAGES.len(), &mut rng).unwrap();
    let first_face = deck.tiles()[0].face;
    let same: Vec<usize> = (0..deck.tiles().len())
        .filter(|&i| deck.tiles()[i].face == first_face)
        .take(2)
        .collect();
    let other = (0..deck.tiles().len())
        .find(|&i| deck.tiles()[i].face != first_face)
        .unwrap();
    assert_eq!(deck.reveal(same[0]), RevealOutcome::Revealed);
    assert_eq!(deck.reveal(same[1]), RevealOutcome::Revealed);
    assert_eq!(deck.reveal(other), RevealOutcome::Mismatched);
    assert!(deck.conceal_pending());
    assert_eq!(deck.matched_sets(), 0);
    deck.conceal_unmatched();
    assert!(deck.tiles().iter().all(|t| t.state == TileState::Hidden));
    assert!(!deck.conceal_pending());
}

#[test]
fn out_of_range_reveal_is_ignored() {
    let mut rng = Lcg::new(13);
    let mut deck = Deck::deal(DeckConfig::default(), TILE_IMAGES.len(), &mut rng).unwrap();
    assert_eq!(deck.reveal(deck.tiles().len()), RevealOutcome::Ignored);
}

#[test]
fn invalid_configs_are_rejected() {
    let mut rng = Lcg::new(1);
    let lopsided = DeckConfig {
        cols: 5,
        rows: 3,
        match_size: 2,
    };
    assert_eq!(
        Deck::deal(lopsided, TILE_IMAGES.len(), &mut rng).unwrap_err(),
        DeckError::UnevenGrid {
            tiles: 15,
            match_size: 2
        }
    );
    let empty = DeckConfig {
        cols: 0,
        rows: 4,
        match_size: 2,
    };
    assert!(matches!(
        Deck::deal(empty, TILE_IMAGES.len(), &mut rng).unwrap_err(),
        DeckError::UnevenGrid { tiles: 0, .. }
    ));
    let oversized = DeckConfig {
        cols: 8,
        rows: 8,
        match_size: 2,
    };
    assert_eq!(
        Deck::deal(oversized, TILE_IMAGES.len(), &mut rng).unwrap_err(),
        DeckError::NotEnoughFaces {
            needed: 32,
            available: TILE_IMAGES.len()
        }
    );
}
