//! Pair-matching mini-game.
//!
//! `2n` items (n sources, n targets) are shuffled together. The learner taps one
//! side then the other; correct pairs are removed, wrong pairs flash for a short
//! window and are then released. Mismatches never end the game.
//!
//! Time is passed in explicitly: a mismatch stores its expiry instant and is
//! cleared by [`MatchingPairs::tick`], so there are no timers to cancel.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::{ChallengeOption, MatchOutcome, MediaRef, OptionId};

pub const MIN_MATCH_PAIRS: usize = 2;
/// Only the first options of a MATCH challenge are played.
pub const MAX_MATCH_PAIRS: usize = 4;
pub const DEFAULT_MISMATCH_WINDOW_MS: i64 = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchingError {
    #[error("matching needs at least {MIN_MATCH_PAIRS} pairs, got {0}")]
    TooFewPairs(usize),

    #[error("pair {pair} is missing its {role} text")]
    MissingSide { pair: OptionId, role: MatchRole },

    #[error("pair {0} appears more than once")]
    DuplicatePair(OptionId),

    #[error("unknown item {0}")]
    UnknownItem(MatchItemId),
}

//
// ─── ITEMS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRole {
    Source,
    Target,
}

impl MatchRole {
    #[must_use]
    pub fn complement(self) -> Self {
        match self {
            MatchRole::Source => MatchRole::Target,
            MatchRole::Target => MatchRole::Source,
        }
    }
}

impl fmt::Display for MatchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRole::Source => f.write_str("source"),
            MatchRole::Target => f.write_str("target"),
        }
    }
}

/// Stable identity of a tile: the pair it belongs to plus its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchItemId {
    pub pair: OptionId,
    pub role: MatchRole,
}

impl MatchItemId {
    #[must_use]
    pub fn new(pair: OptionId, role: MatchRole) -> Self {
        Self { pair, role }
    }
}

impl fmt::Display for MatchItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pair, self.role)
    }
}

/// One source/target association supplied by the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub id: OptionId,
    pub source: String,
    pub target: String,
    pub audio_ref: Option<MediaRef>,
}

impl MatchPair {
    #[must_use]
    pub fn new(id: OptionId, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            target: target.into(),
            audio_ref: None,
        }
    }

    /// Reads pairs from MATCH options: `text` is the source side and the image
    /// reference carries the target side.
    ///
    /// # Errors
    ///
    /// Returns `MatchingError` when a side is blank or fewer than two pairs remain.
    pub fn from_options(options: &[ChallengeOption]) -> Result<Vec<Self>, MatchingError> {
        let pairs = options
            .iter()
            .take(MAX_MATCH_PAIRS)
            .map(|option| {
                let target = option
                    .image_ref
                    .as_ref()
                    .map(|image| image.as_str().to_owned())
                    .unwrap_or_default();
                MatchPair {
                    id: option.id,
                    source: option.text.clone(),
                    target,
                    audio_ref: option.audio_ref.clone(),
                }
            })
            .collect::<Vec<_>>();
        validate_pairs(&pairs)?;
        Ok(pairs)
    }
}

fn validate_pairs(pairs: &[MatchPair]) -> Result<(), MatchingError> {
    let mut seen = HashSet::with_capacity(pairs.len());
    for pair in pairs {
        if pair.source.trim().is_empty() {
            return Err(MatchingError::MissingSide {
                pair: pair.id,
                role: MatchRole::Source,
            });
        }
        if pair.target.trim().is_empty() {
            return Err(MatchingError::MissingSide {
                pair: pair.id,
                role: MatchRole::Target,
            });
        }
        if !seen.insert(pair.id) {
            return Err(MatchingError::DuplicatePair(pair.id));
        }
    }
    if pairs.len() < MIN_MATCH_PAIRS {
        return Err(MatchingError::TooFewPairs(pairs.len()));
    }
    Ok(())
}

/// A tile on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchItem {
    pub id: MatchItemId,
    pub text: String,
    pub audio_ref: Option<MediaRef>,
}

impl MatchItem {
    #[must_use]
    pub fn role(&self) -> MatchRole {
        self.id.role
    }

    #[must_use]
    pub fn pair_id(&self) -> OptionId {
        self.id.pair
    }
}

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    /// The item is now the pending selection for its side.
    Pending(MatchItemId),
    /// A pair was matched; more remain.
    Paired(OptionId),
    /// The last pair was matched.
    Completed,
    /// Wrong pair; both items are flagged until `until`.
    Mismatch {
        items: [MatchItemId; 2],
        until: DateTime<Utc>,
    },
    /// Tap had no effect (matched tile, flash in progress, or game over).
    Ignored,
}

/// Result of one tap, plus the audio cue to play for the tapped tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub event: MatchEvent,
    pub audio: Option<MediaRef>,
}

impl Selection {
    fn ignored() -> Self {
        Self {
            event: MatchEvent::Ignored,
            audio: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Mismatch {
    items: [MatchItemId; 2],
    until: DateTime<Utc>,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct MatchingPairs {
    items: Vec<MatchItem>,
    pair_count: usize,
    matched: HashSet<OptionId>,
    pending: Option<MatchItemId>,
    mismatch: Option<Mismatch>,
    window: Duration,
}

impl MatchingPairs {
    /// Builds the board and shuffles it with `rng`.
    ///
    /// # Errors
    ///
    /// Returns `MatchingError` for fewer than two pairs or a blank side.
    pub fn new<R: Rng + ?Sized>(pairs: &[MatchPair], rng: &mut R) -> Result<Self, MatchingError> {
        validate_pairs(pairs)?;

        let mut items = Vec::with_capacity(pairs.len() * 2);
        items.extend(pairs.iter().map(|pair| MatchItem {
            id: MatchItemId::new(pair.id, MatchRole::Source),
            text: pair.source.clone(),
            audio_ref: pair.audio_ref.clone(),
        }));
        items.extend(pairs.iter().map(|pair| MatchItem {
            id: MatchItemId::new(pair.id, MatchRole::Target),
            text: pair.target.clone(),
            audio_ref: None,
        }));
        items.shuffle(rng);

        Ok(Self {
            items,
            pair_count: pairs.len(),
            matched: HashSet::with_capacity(pairs.len()),
            pending: None,
            mismatch: None,
            window: Duration::milliseconds(DEFAULT_MISMATCH_WINDOW_MS),
        })
    }

    /// Builds the board with the thread-local RNG.
    ///
    /// # Errors
    ///
    /// See [`MatchingPairs::new`].
    pub fn shuffled(pairs: &[MatchPair]) -> Result<Self, MatchingError> {
        Self::new(pairs, &mut rand::rng())
    }

    #[must_use]
    pub fn with_mismatch_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Tiles in display order.
    #[must_use]
    pub fn items(&self) -> &[MatchItem] {
        &self.items
    }

    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.pair_count
    }

    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    #[must_use]
    pub fn is_matched(&self, id: MatchItemId) -> bool {
        self.matched.contains(&id.pair)
    }

    #[must_use]
    pub fn pending(&self) -> Option<MatchItemId> {
        self.pending
    }

    /// Whether the item is currently flashing as part of a wrong pair.
    #[must_use]
    pub fn is_flagged_wrong(&self, id: MatchItemId, now: DateTime<Utc>) -> bool {
        self.mismatch
            .as_ref()
            .is_some_and(|m| now < m.until && m.items.contains(&id))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.matched.len() == self.pair_count
    }

    /// `Matched` once every pair is found.
    #[must_use]
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.is_complete().then_some(MatchOutcome::Matched)
    }

    /// Releases an expired mismatch. Returns `true` if something was cleared.
    ///
    /// Calling it with no mismatch pending, or before expiry, does nothing.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        match &self.mismatch {
            Some(m) if now >= m.until => {
                self.mismatch = None;
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Handles a tap on `id` at `now`.
    ///
    /// # Errors
    ///
    /// Returns `MatchingError::UnknownItem` if `id` is not on the board.
    pub fn select(
        &mut self,
        id: MatchItemId,
        now: DateTime<Utc>,
    ) -> Result<Selection, MatchingError> {
        self.tick(now);

        let item = self
            .items
            .iter()
            .find(|item| item.id == id)
            .ok_or(MatchingError::UnknownItem(id))?;

        if self.is_complete() || self.is_matched(id) || self.mismatch.is_some() {
            return Ok(Selection::ignored());
        }

        let audio = item.audio_ref.clone();
        let event = match self.pending {
            Some(pending) if pending.role == id.role.complement() => {
                if pending.pair == id.pair {
                    self.matched.insert(id.pair);
                    self.pending = None;
                    if self.is_complete() {
                        MatchEvent::Completed
                    } else {
                        MatchEvent::Paired(id.pair)
                    }
                } else {
                    let items = [pending, id];
                    let until = now + self.window;
                    self.mismatch = Some(Mismatch { items, until });
                    MatchEvent::Mismatch { items, until }
                }
            }
            // Nothing pending, or same side again: the new tap replaces it.
            _ => {
                self.pending = Some(id);
                MatchEvent::Pending(id)
            }
        };

        Ok(Selection { event, audio })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pairs() -> Vec<MatchPair> {
        vec![
            MatchPair::new(OptionId::new(1), "Man", "rra"),
            MatchPair::new(OptionId::new(2), "Woman", "mma"),
            MatchPair::new(OptionId::new(3), "Hello", "Dumêla"),
        ]
    }

    fn board() -> MatchingPairs {
        MatchingPairs::new(&pairs(), &mut StdRng::seed_from_u64(7)).unwrap()
    }

    fn src(pair: u64) -> MatchItemId {
        MatchItemId::new(OptionId::new(pair), MatchRole::Source)
    }

    fn tgt(pair: u64) -> MatchItemId {
        MatchItemId::new(OptionId::new(pair), MatchRole::Target)
    }

    #[test]
    fn shuffle_is_a_permutation() {
        for seed in 0..20 {
            let game = MatchingPairs::new(&pairs(), &mut StdRng::seed_from_u64(seed)).unwrap();
            let mut shuffled: Vec<_> = game
                .items()
                .iter()
                .map(|item| (item.text.clone(), item.role()))
                .collect();
            let mut expected: Vec<_> = pairs()
                .into_iter()
                .flat_map(|p| [(p.source, MatchRole::Source), (p.target, MatchRole::Target)])
                .collect();
            shuffled.sort();
            expected.sort();
            assert_eq!(shuffled, expected);
        }
    }

    #[test]
    fn too_few_pairs_fail_fast() {
        let err = MatchingPairs::shuffled(&pairs()[..1]).unwrap_err();
        assert_eq!(err, MatchingError::TooFewPairs(1));
    }

    #[test]
    fn blank_target_fails_fast() {
        let mut broken = pairs();
        broken[1].target = " ".into();
        let err = MatchingPairs::shuffled(&broken).unwrap_err();
        assert_eq!(
            err,
            MatchingError::MissingSide {
                pair: OptionId::new(2),
                role: MatchRole::Target
            }
        );
    }

    #[test]
    fn pairs_from_options_use_image_as_target_and_cap_at_four() {
        let options: Vec<_> = (1..=6)
            .map(|i| {
                ChallengeOption::new(OptionId::new(i), format!("src{i}"), true)
                    .with_image(format!("tgt{i}"))
            })
            .collect();
        let pairs = MatchPair::from_options(&options).unwrap();
        assert_eq!(pairs.len(), MAX_MATCH_PAIRS);
        assert_eq!(pairs[0].target, "tgt1");
    }

    #[test]
    fn matching_every_pair_completes_in_either_order() {
        let mut game = board();
        let now = fixed_now();

        assert_eq!(
            game.select(src(1), now).unwrap().event,
            MatchEvent::Pending(src(1))
        );
        assert_eq!(
            game.select(tgt(1), now).unwrap().event,
            MatchEvent::Paired(OptionId::new(1))
        );
        assert_eq!(game.outcome(), None);

        game.select(tgt(2), now).unwrap();
        assert_eq!(
            game.select(src(2), now).unwrap().event,
            MatchEvent::Paired(OptionId::new(2))
        );

        game.select(src(3), now).unwrap();
        assert_eq!(game.select(tgt(3), now).unwrap().event, MatchEvent::Completed);
        assert_eq!(game.outcome(), Some(MatchOutcome::Matched));
        assert_eq!(game.matched_count(), 3);
    }

    #[test]
    fn mismatch_flashes_then_releases_pending() {
        let mut game = board();
        let now = fixed_now();

        game.select(src(1), now).unwrap();
        let selection = game.select(tgt(2), now).unwrap();
        let until = now + Duration::milliseconds(DEFAULT_MISMATCH_WINDOW_MS);
        assert_eq!(
            selection.event,
            MatchEvent::Mismatch {
                items: [src(1), tgt(2)],
                until
            }
        );
        assert!(game.is_flagged_wrong(src(1), now));
        assert_eq!(game.outcome(), None);

        // Taps during the flash are ignored.
        let during = now + Duration::milliseconds(100);
        assert_eq!(game.select(tgt(1), during).unwrap().event, MatchEvent::Ignored);

        assert!(game.tick(until));
        assert_eq!(game.pending(), None);
        assert!(!game.is_flagged_wrong(src(1), until));

        // A stale tick is a no-op.
        assert!(!game.tick(until + Duration::seconds(5)));

        game.select(src(1), until).unwrap();
        assert_eq!(
            game.select(tgt(1), until).unwrap().event,
            MatchEvent::Paired(OptionId::new(1))
        );
    }

    #[test]
    fn same_side_tap_replaces_pending() {
        let mut game = board();
        let now = fixed_now();
        game.select(src(1), now).unwrap();
        assert_eq!(
            game.select(src(2), now).unwrap().event,
            MatchEvent::Pending(src(2))
        );
        assert_eq!(
            game.select(tgt(2), now).unwrap().event,
            MatchEvent::Paired(OptionId::new(2))
        );
    }

    #[test]
    fn matched_tiles_ignore_taps() {
        let mut game = board();
        let now = fixed_now();
        game.select(src(1), now).unwrap();
        game.select(tgt(1), now).unwrap();
        assert_eq!(game.select(src(1), now).unwrap().event, MatchEvent::Ignored);
        assert_eq!(game.pending(), None);
    }

    #[test]
    fn audio_cue_follows_the_tapped_tile() {
        let mut with_audio = pairs();
        with_audio[0].audio_ref = Some(MediaRef::new("/audio/rra.mp3"));
        let mut game = MatchingPairs::new(&with_audio, &mut StdRng::seed_from_u64(1)).unwrap();
        let now = fixed_now();

        let selection = game.select(src(1), now).unwrap();
        assert_eq!(selection.audio, Some(MediaRef::new("/audio/rra.mp3")));
        let selection = game.select(tgt(1), now).unwrap();
        assert_eq!(selection.audio, None);
    }

    #[test]
    fn unknown_item_is_an_error() {
        let mut game = board();
        let err = game.select(src(99), fixed_now()).unwrap_err();
        assert_eq!(err, MatchingError::UnknownItem(src(99)));
    }
}
