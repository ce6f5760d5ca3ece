//! Community closure votes, one per location per client.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snowday_core::{ConfigError, StorageError};
use snowday_store::{JsonStoreExt, KeyValueStore};

const TALLY_KEY_PREFIX: &str = "snowday:votes:";
const VOTED_KEY_PREFIX: &str = "snowday:voted:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Closes,
    Opens,
}

impl FromStr for VoteChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "closes" | "closed" | "close" => Ok(Self::Closes),
            "opens" | "open" => Ok(Self::Opens),
            other => Err(ConfigError::Invalid(format!("unknown vote '{}'", other))),
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closes => "closes",
            Self::Opens => "opens",
        })
    }
}

/// Running tally for one location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommunityVote {
    pub closes: u32,
    pub opens: u32,
}

impl CommunityVote {
    pub fn total(&self) -> u32 {
        self.closes.saturating_add(self.opens)
    }

    /// Share of "closes" votes in whole percent; `None` before the first vote.
    pub fn closes_pct(&self) -> Option<u8> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(((f64::from(self.closes) / f64::from(total)) * 100.0).round() as u8)
    }

    fn with(self, choice: VoteChoice) -> Self {
        match choice {
            VoteChoice::Closes => Self {
                closes: self.closes.saturating_add(1),
                ..self
            },
            VoteChoice::Opens => Self {
                opens: self.opens.saturating_add(1),
                ..self
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    Counted,
    AlreadyVoted,
    /// Storage failed; the tally shown is what could be read before the vote
    NotPersisted,
    /// Tally saved but the "already voted" flag was not
    CountedWithoutFlag,
    MissingLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub tally: CommunityVote,
    pub status: VoteStatus,
}

/// Persisted tallies plus the per-location "already voted" flag.
#[derive(Clone)]
pub struct VoteStore {
    store: Arc<dyn KeyValueStore>,
}

impl VoteStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current tally; absent or unreadable reads as zero.
    pub fn get_tally(&self, location: &str) -> CommunityVote {
        self.read_tally(&normalize(location)).unwrap_or_else(|e| {
            tracing::warn!("Vote tally unreadable: {}", e);
            CommunityVote::default()
        })
    }

    pub fn has_voted(&self, location: &str) -> bool {
        self.read_voted(&normalize(location)).unwrap_or_else(|e| {
            tracing::warn!("Vote flag unreadable: {}", e);
            false
        })
    }

    /// Record a vote unless this client already voted for `location`.
    pub fn vote(&self, location: &str, choice: VoteChoice) -> VoteOutcome {
        let location = normalize(location);
        if location.is_empty() {
            return VoteOutcome {
                tally: CommunityVote::default(),
                status: VoteStatus::MissingLocation,
            };
        }

        let current = match self.read_tally(&location) {
            Ok(tally) => tally,
            Err(e) => {
                tracing::warn!("Vote not persisted for {}: {}", location, e);
                return VoteOutcome {
                    tally: CommunityVote::default(),
                    status: VoteStatus::NotPersisted,
                };
            }
        };

        match self.read_voted(&location) {
            Ok(true) => {
                tracing::debug!("Repeat vote ignored for {}", location);
                return VoteOutcome {
                    tally: current,
                    status: VoteStatus::AlreadyVoted,
                };
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Vote not persisted for {}: {}", location, e);
                return VoteOutcome {
                    tally: current,
                    status: VoteStatus::NotPersisted,
                };
            }
        }

        let next = current.with(choice);
        // Tally before flag.
        if let Err(e) = self.store.put_json(&tally_key(&location), &next) {
            tracing::warn!("Vote not persisted for {}: {}", location, e);
            return VoteOutcome {
                tally: current,
                status: VoteStatus::NotPersisted,
            };
        }

        match self.store.put_json(&voted_key(&location), &true) {
            Ok(()) => {
                tracing::info!("Vote '{}' counted for {}", choice, location);
                VoteOutcome {
                    tally: next,
                    status: VoteStatus::Counted,
                }
            }
            Err(e) => {
                tracing::warn!("Vote counted for {} but flag not saved: {}", location, e);
                VoteOutcome {
                    tally: next,
                    status: VoteStatus::CountedWithoutFlag,
                }
            }
        }
    }

    fn read_tally(&self, location: &str) -> Result<CommunityVote, StorageError> {
        Ok(self
            .store
            .get_json::<CommunityVote>(&tally_key(location))?
            .unwrap_or_default())
    }

    fn read_voted(&self, location: &str) -> Result<bool, StorageError> {
        Ok(self
            .store
            .get_json::<bool>(&voted_key(location))?
            .unwrap_or(false))
    }
}

fn normalize(location: &str) -> String {
    location.trim().to_uppercase()
}

fn tally_key(location: &str) -> String {
    format!("{}{}", TALLY_KEY_PREFIX, location)
}

fn voted_key(location: &str) -> String {
    format!("{}{}", VOTED_KEY_PREFIX, location)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use snowday_store::{MemoryStore, StoreResult};

    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.get(key)
        }
        fn put(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StorageError::Unavailable("read-only".into()))
        }
        fn delete(&self, _key: &str) -> StoreResult<()> {
            Err(StorageError::Unavailable("read-only".into()))
        }
    }

    fn votes() -> VoteStore {
        VoteStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_absent_tally_is_zero() {
        let store = votes();
        assert_eq!(store.get_tally("05401"), CommunityVote::default());
        assert!(!store.has_voted("05401"));
    }

    #[test]
    fn test_second_vote_is_noop() {
        let store = votes();
        let first = store.vote("05401", VoteChoice::Closes);
        let second = store.vote("05401", VoteChoice::Closes);

        assert_eq!(first.status, VoteStatus::Counted);
        assert_eq!(second.status, VoteStatus::AlreadyVoted);
        assert_eq!(second.tally, CommunityVote { closes: 1, opens: 0 });
        assert_eq!(store.get_tally("05401").total(), 1);
    }

    #[test]
    fn test_locations_are_independent_and_normalized() {
        let store = votes();
        store.vote("k1a 0b1", VoteChoice::Opens);

        assert!(store.has_voted(" K1A 0B1 "));
        assert!(!store.has_voted("05401"));
        assert_eq!(
            store.vote("05401", VoteChoice::Closes).status,
            VoteStatus::Counted
        );
    }

    #[test]
    fn test_blank_location_is_rejected() {
        let outcome = votes().vote("   ", VoteChoice::Opens);
        assert_eq!(outcome.status, VoteStatus::MissingLocation);
    }

    #[test]
    fn test_storage_failure_keeps_readable_tally() {
        let inner = MemoryStore::new();
        inner
            .put_json(&tally_key("05401"), &CommunityVote { closes: 3, opens: 2 })
            .unwrap();
        let store = VoteStore::new(Arc::new(ReadOnlyStore(inner)));

        let outcome = store.vote("05401", VoteChoice::Closes);

        assert_eq!(outcome.status, VoteStatus::NotPersisted);
        assert_eq!(outcome.tally, CommunityVote { closes: 3, opens: 2 });
        assert!(!store.has_voted("05401"));
    }

    /// Accepts tally writes, refuses the voted flag.
    struct FlaglessStore(MemoryStore);

    impl KeyValueStore for FlaglessStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.get(key)
        }
        fn put(&self, key: &str, value: &str) -> StoreResult<()> {
            if key.starts_with(VOTED_KEY_PREFIX) {
                return Err(StorageError::Unavailable("flag table locked".into()));
            }
            self.0.put(key, value)
        }
        fn delete(&self, key: &str) -> StoreResult<()> {
            self.0.delete(key)
        }
    }

    #[test]
    fn test_flag_failure_reports_saved_tally() {
        let store = VoteStore::new(Arc::new(FlaglessStore(MemoryStore::new())));

        let outcome = store.vote("05401", VoteChoice::Opens);

        assert_eq!(outcome.status, VoteStatus::CountedWithoutFlag);
        assert_eq!(outcome.tally, CommunityVote { closes: 0, opens: 1 });
        assert_eq!(store.get_tally("05401"), outcome.tally);
        assert!(!store.has_voted("05401"));
    }

    #[test]
    fn test_closes_pct() {
        assert_eq!(CommunityVote::default().closes_pct(), None);
        assert_eq!(CommunityVote { closes: 2, opens: 1 }.closes_pct(), Some(67));
    }

    #[test]
    fn test_choice_parse() {
        assert_eq!("Closes".parse::<VoteChoice>().unwrap(), VoteChoice::Closes);
        assert_eq!("open".parse::<VoteChoice>().unwrap(), VoteChoice::Opens);
        assert!("maybe".parse::<VoteChoice>().is_err());
    }
}
