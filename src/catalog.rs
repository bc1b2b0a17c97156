//! Read-only episode catalog.
//!
//! The coordinator consumes episode/category/clue data but never writes it
//! — ingest and authoring are out of scope (see SPEC_FULL.md §1). This
//! module defines the narrow lookup contract the rest of the crate uses,
//! plus an in-memory implementation suited to tests and to a small
//! single-process deployment that loads its episodes at startup.

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::protocol::types::Episode;

/// Read-only access to episodes. A real deployment would likely back this
/// with the same Postgres instance as the Durable Store, behind a simple
/// `SELECT`-only repository; this trait lets the rest of the coordinator
/// stay agnostic to that choice.
#[async_trait]
pub trait EpisodeCatalog: Send + Sync {
    async fn get_episode(&self, episode_id: i64) -> Result<Episode, CatalogError>;
}

/// An in-memory catalog holding a fixed set of episodes, keyed by id.
/// Used by tests and by any deployment that loads its board data wholesale
/// at startup rather than querying it per game.
pub struct StaticCatalog {
    episodes: Vec<Episode>,
}

impl StaticCatalog {
    pub fn new(episodes: Vec<Episode>) -> Self {
        Self { episodes }
    }
}

#[async_trait]
impl EpisodeCatalog for StaticCatalog {
    async fn get_episode(&self, episode_id: i64) -> Result<Episode, CatalogError> {
        self.episodes
            .iter()
            .find(|e| e.id == episode_id)
            .cloned()
            .ok_or(CatalogError::EpisodeNotFound(episode_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{Category, Clue, Round};

    fn sample_episode() -> Episode {
        Episode {
            id: 1,
            season: 10,
            episode_number: 42,
            categories: vec![
                Category {
                    id: 1,
                    name: "History".into(),
                    round: Round::Single,
                    position: 0,
                    clues: vec![Clue {
                        id: 100,
                        position: 0,
                        value: 200,
                        question: "q1".into(),
                        answer: "a1".into(),
                        is_daily_double: false,
                    }],
                },
                Category {
                    id: 2,
                    name: "Science".into(),
                    round: Round::Double,
                    position: 0,
                    clues: vec![Clue {
                        id: 200,
                        position: 0,
                        value: 400,
                        question: "q2".into(),
                        answer: "a2".into(),
                        is_daily_double: false,
                    }],
                },
            ],
        }
    }

    #[tokio::test]
    async fn returns_the_requested_episode() {
        let catalog = StaticCatalog::new(vec![sample_episode()]);
        let episode = catalog.get_episode(1).await.unwrap();
        assert_eq!(episode.season, 10);
    }

    #[tokio::test]
    async fn unknown_episode_id_is_an_error() {
        let catalog = StaticCatalog::new(vec![sample_episode()]);
        let err = catalog.get_episode(999).await.unwrap_err();
        assert!(matches!(err, CatalogError::EpisodeNotFound(999)));
    }

    #[test]
    fn categories_for_round_filters_correctly() {
        let episode = sample_episode();
        let single: Vec<_> = episode.categories_for(Round::Single).collect();
        let double: Vec<_> = episode.categories_for(Round::Double).collect();
        assert_eq!(single.len(), 1);
        assert_eq!(double.len(), 1);
        assert_eq!(single[0].name, "History");
    }
}
