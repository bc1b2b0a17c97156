//! Round State Machine.
//!
//! Orchestrates one game's progression through per-clue micro-states
//! (idle → revealed → enabled → buzzed → judged → idle') and the two
//! wager flows that supersede normal play: Daily Double and Final
//! Jeopardy. See SPEC_FULL.md §4.3 for the full transition table this
//! module implements.
//!
//! Every public method here takes a game id, mutates the Ephemeral State
//! Store under its per-game atomic transaction, mirrors authoritative
//! score changes and an audit event to the Durable Store, and returns the
//! broadcast(s) the Session Gateway should fan out. Handler failures are
//! typed `GameError`s the gateway converts into a per-client error frame;
//! buzz rejections are not errors and never appear here (they're handled
//! entirely inside `buzzer::handle_buzz`).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::thread_rng;
use serde_json::json;

use crate::audit::{self, ActionKind};
use crate::catalog::EpisodeCatalog;
use crate::error::GameError;
use crate::protocol::server_messages::ServerMessage;
use crate::protocol::types::{
    DailyDoubleState, DdStage, Episode, FinalJeopardyState, FjStage, GameStatus, LiveGameState,
    Round, Seat,
};
use crate::store::{ClueRevealRow, DurableStore, EphemeralStore};

pub struct GameCoordinator {
    pub ephemeral: Arc<EphemeralStore>,
    pub durable: Arc<dyn DurableStore>,
    pub catalog: Arc<dyn EpisodeCatalog>,
}

/// Select the three Daily Double clues for a fresh game: one random clue
/// from the single-round categories, and two from two distinct
/// double-round categories. The catalog's `is_daily_double` flag is never
/// consulted (SPEC_FULL.md §9) — this set is the sole source of truth.
pub fn select_daily_doubles(episode: &Episode) -> HashSet<i64> {
    let mut rng = thread_rng();
    let mut chosen = HashSet::new();

    let single_clues: Vec<i64> = episode
        .categories_for(Round::Single)
        .flat_map(|c| c.clues.iter().map(|cl| cl.id))
        .collect();
    if let Some(&clue_id) = single_clues.choose(&mut rng) {
        chosen.insert(clue_id);
    }

    let mut double_categories: Vec<_> = episode.categories_for(Round::Double).collect();
    double_categories.shuffle(&mut rng);
    for category in double_categories.into_iter().take(2) {
        if let Some(clue) = category.clues.choose(&mut rng) {
            chosen.insert(clue.id);
        }
    }

    chosen
}

impl GameCoordinator {
    async fn require_active(&self, state: &LiveGameState) -> Result<(), GameError> {
        match state.status {
            GameStatus::Completed => Err(GameError::AlreadyCompleted),
            GameStatus::Abandoned => Err(GameError::AlreadyAbandoned),
            _ => Ok(()),
        }
    }

    /// Rejects every mutating command on a `completed`/`abandoned` session
    /// (spec §3 invariants) other than the idempotent `end_game`/
    /// `abandon_game` path, which checks this itself inside `terminate`.
    async fn check_active(&self, game_id: &str) -> Result<LiveGameState, GameError> {
        let snapshot = self.ephemeral.snapshot(game_id).await?;
        self.require_active(&snapshot).await?;
        Ok(snapshot)
    }

    async fn participant_names(&self, game_id: &str) -> HashMap<Seat, String> {
        self.durable
            .load_participants(game_id)
            .await
            .map(|rows| rows.into_iter().map(|r| (r.seat, r.name)).collect())
            .unwrap_or_default()
    }

    async fn roster_size(&self, game_id: &str) -> usize {
        self.durable
            .load_participants(game_id)
            .await
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    async fn persist_score(&self, game_id: &str, seat: Seat, score: i64) {
        if let Err(err) = self.durable.upsert_score(game_id, seat, score).await {
            tracing::warn!(game_id, seat, error = %err, "failed to persist score");
        }
    }

    /// Records a clue's reveal outcome once its judgment has closed it,
    /// independent of the audit log (SPEC_FULL.md §10.5). Best-effort, like
    /// `audit::record`.
    async fn record_clue_reveal(&self, game_id: &str, clue_id: i64, seat: Option<Seat>, correct: bool) {
        let reveal = ClueRevealRow {
            game_id: game_id.to_string(),
            clue_id,
            revealer_seat: None,
            buzz_winner_seat: seat,
            correct: Some(correct),
        };
        if let Err(err) = self.durable.append_clue_reveal(reveal).await {
            tracing::warn!(game_id, clue_id, error = %err, "failed to persist clue reveal record");
        }
    }

    fn mint_token() -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0)
    }

    /// `reveal_clue`: idle → revealed(locked). Diverges into the Daily
    /// Double flow when the clue is one of the session's chosen DDs.
    pub async fn reveal_clue(&self, game_id: &str, clue_id: i64) -> Result<Vec<ServerMessage>, GameError> {
        let episode_id = self.check_active(game_id).await?.episode_id;
        let episode = self.catalog.get_episode(episode_id).await?;
        let (category, clue) = episode
            .find_clue(clue_id)
            .ok_or(GameError::InvalidClue { clue_id })?;
        let category_name = category.name.clone();
        let value = clue.value;
        let question = clue.question.clone();
        let answer = clue.answer.clone();

        let (messages, current_player) = self
            .ephemeral
            .with_game(game_id, move |state| {
                state.revealed_clues.insert(clue_id);
                state.current_clue = Some(clue_id);
                state.buzzer.reset();

                if state.daily_doubles.contains(&clue_id) {
                    let player_number = state.current_player.unwrap_or(1);
                    state.dd_state = Some(DailyDoubleState {
                        stage: DdStage::Detected,
                        player_number,
                        wager: None,
                        answer: None,
                    });
                    (
                        vec![ServerMessage::DailyDoubleDetected { player_number }],
                        state.current_player,
                    )
                } else {
                    (
                        vec![ServerMessage::ClueRevealed {
                            clue_id,
                            category: category_name,
                            value,
                            question,
                            answer,
                        }],
                        state.current_player,
                    )
                }
            })
            .await?;
        let _ = current_player;

        audit::record(
            self.durable.as_ref(),
            game_id,
            None,
            ActionKind::RevealClue,
            json!({"clue_id": clue_id}),
        )
        .await;

        Ok(messages)
    }

    /// `enable_buzzer`: mints a fresh unlock token and opens the buzzer.
    pub async fn enable_buzzer(&self, game_id: &str) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        let token = Self::mint_token();
        self.ephemeral
            .with_game(game_id, move |state| {
                state.buzzer.unlock_token = Some(token);
                state.buzzer.locked = false;
            })
            .await?;
        Ok(ServerMessage::BuzzerEnabled {
            unlock_token: token.to_string(),
        })
    }

    /// `judge_answer`: applies the score delta and either closes the clue
    /// out (correct, or every seat now exhausted) or re-opens the buzzer
    /// for the remaining seats.
    pub async fn judge_answer(
        &self,
        game_id: &str,
        seat: Seat,
        correct: bool,
        value: i64,
    ) -> Result<Vec<ServerMessage>, GameError> {
        let roster_size = self.roster_size(game_id).await;
        let pre_snapshot = self.check_active(game_id).await?;
        let episode_id = pre_snapshot.episode_id;
        let clue_id = pre_snapshot.current_clue;
        let delta = if correct { value } else { -value };
        let new_token = Self::mint_token();

        let outcome = self
            .ephemeral
            .with_game(game_id, move |state| {
                let score = state.scores.entry(seat).or_insert(0);
                *score += delta;
                let new_score = *score;

                if correct {
                    state.current_player = Some(seat);
                    state.buzzer.reset();
                    state.attempted_players.clear();
                    Outcome::Resolved { new_score, exhausted: false }
                } else {
                    state.attempted_players.insert(seat);
                    let exhausted = state.attempted_players.len() >= roster_size && roster_size > 0;
                    if exhausted {
                        state.buzzer.reset();
                        state.attempted_players.clear();
                        state.current_clue = None;
                    } else {
                        state.buzzer.clear_for_retry();
                        state.buzzer.unlock_token = Some(new_token);
                    }
                    Outcome::Resolved { new_score, exhausted }
                }
            })
            .await?;

        let Outcome::Resolved { new_score, exhausted } = outcome;
        self.persist_score(game_id, seat, new_score).await;
        audit::record(
            self.durable.as_ref(),
            game_id,
            Some(seat),
            ActionKind::JudgeAnswer,
            json!({"correct": correct, "value": value}),
        )
        .await;

        if correct || exhausted {
            if let Some(clue_id) = clue_id {
                self.record_clue_reveal(game_id, clue_id, Some(seat), correct).await;
            }
        }

        let mut messages = vec![ServerMessage::AnswerJudged {
            player_number: seat,
            correct,
            value,
            new_score,
        }];

        if !correct && exhausted {
            let answer = match clue_id {
                Some(clue_id) => self.lookup_answer(episode_id, clue_id).await,
                None => None,
            };
            let snapshot = self.ephemeral.snapshot(game_id).await?;
            messages.push(ServerMessage::ClueExhausted {
                clue_id: clue_id.unwrap_or(0),
                answer: answer.unwrap_or_default(),
            });
            messages.push(ServerMessage::ReturnToBoard {
                scores: snapshot.scores,
                revealed_clues: snapshot.revealed_clues,
            });
        } else if !correct {
            messages.push(ServerMessage::BuzzerEnabled {
                unlock_token: new_token.to_string(),
            });
        }

        Ok(messages)
    }

    async fn lookup_answer(&self, episode_id: i64, clue_id: i64) -> Option<String> {
        let episode = self.catalog.get_episode(episode_id).await.ok()?;
        episode.find_clue(clue_id).map(|(_, clue)| clue.answer.clone())
    }

    /// `next_clue`: full per-clue reset, returning to idle. A no-op
    /// broadcast (repeating current scores/revealed set) when already idle.
    pub async fn next_clue(&self, game_id: &str) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        let snapshot = self
            .ephemeral
            .with_game(game_id, |state| {
                state.current_clue = None;
                state.dd_state = None;
                state.buzzer.reset();
                state.attempted_players.clear();
                state.clone()
            })
            .await?;

        Ok(ServerMessage::ReturnToBoard {
            scores: snapshot.scores,
            revealed_clues: snapshot.revealed_clues,
        })
    }

    /// `reset_game`: zeroes every seat's score in both stores and wipes
    /// the board back to its initial state. Idempotent: resetting twice
    /// is equivalent to resetting once.
    pub async fn reset_game(&self, game_id: &str) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        let names = self.participant_names(game_id).await;
        let seats: Vec<Seat> = names.keys().copied().collect();

        let scores = self
            .ephemeral
            .with_game(game_id, move |state| {
                for seat in &seats {
                    state.scores.insert(*seat, 0);
                }
                state.revealed_clues.clear();
                state.current_round = Round::Single;
                state.current_player = None;
                state.dd_state = None;
                state.fj_state = None;
                state.buzzer = Default::default();
                state.attempted_players.clear();
                state.scores.clone()
            })
            .await?;

        for (&seat, &score) in &scores {
            self.persist_score(game_id, seat, score).await;
        }
        audit::record(self.durable.as_ref(), game_id, None, ActionKind::ResetGame, json!({})).await;

        Ok(ServerMessage::GameReset { scores, names })
    }

    /// `adjust_score`: an arbitrary signed delta outside normal play.
    pub async fn adjust_score(
        &self,
        game_id: &str,
        seat: Seat,
        adjustment: i64,
    ) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        let new_score = self
            .ephemeral
            .with_game(game_id, move |state| {
                let score = state.scores.entry(seat).or_insert(0);
                *score += adjustment;
                *score
            })
            .await?;
        self.persist_score(game_id, seat, new_score).await;
        audit::record(
            self.durable.as_ref(),
            game_id,
            Some(seat),
            ActionKind::AdjustScore,
            json!({"adjustment": adjustment}),
        )
        .await;
        Ok(ServerMessage::ScoreAdjusted {
            player_number: seat,
            adjustment,
            new_score,
        })
    }

    /// `start_round`: advances the macro round. Entering `double` hands
    /// board control to the lowest-scoring seat (ties broken by lowest
    /// seat number), per SPEC_FULL.md §4.3's round-start side effect.
    pub async fn start_round(&self, game_id: &str, round: Round) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        let current_player = self
            .ephemeral
            .with_game(game_id, move |state| {
                state.current_round = round;
                state.revealed_clues.clear();
                state.buzzer = Default::default();
                state.attempted_players.clear();

                if round == Round::Double {
                    state.current_player = state
                        .scores
                        .iter()
                        .min_by_key(|(&seat, &score)| (score, seat))
                        .map(|(&seat, _)| seat);
                }
                state.current_player
            })
            .await?;

        self.durable.set_current_round(game_id, round).await.ok();
        audit::record(
            self.durable.as_ref(),
            game_id,
            None,
            ActionKind::StartRound,
            json!({"round": round.to_string()}),
        )
        .await;

        Ok(ServerMessage::RoundChanged { round, current_player })
    }

    /// Daily Double: host confirms the clue is in play; wager is now open.
    pub async fn reveal_daily_double(&self, game_id: &str) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        let player_number = self
            .ephemeral
            .with_game(game_id, |state| {
                if let Some(dd) = state.dd_state.as_mut() {
                    dd.stage = DdStage::Revealed;
                }
                state.dd_state.as_ref().map(|dd| dd.player_number)
            })
            .await?
            .ok_or(GameError::NotActive)?;
        Ok(ServerMessage::DailyDoubleRevealed { player_number })
    }

    /// Daily Double: the wagerer submits their wager (min 5, max = the
    /// round cap, or the wagerer's own score if it exceeds the cap).
    pub async fn submit_wager(&self, game_id: &str, seat: Seat, wager: i64) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        self.ephemeral
            .with_game(game_id, move |state| -> Result<ServerMessage, GameError> {
                let dd = state.dd_state.as_ref().ok_or(GameError::NotActive)?;
                if dd.player_number != seat {
                    return Err(GameError::NotDailyDoubleWagerer { seat });
                }
                let score = *state.scores.get(&seat).unwrap_or(&0);
                let cap = state.current_round.daily_double_cap();
                let maximum = if score > 0 { cap.max(score) } else { cap };
                if wager < 5 {
                    return Err(GameError::WagerTooLow { wager, minimum: 5 });
                }
                if wager > maximum {
                    return Err(GameError::WagerTooHigh { wager, maximum });
                }
                if let Some(dd) = state.dd_state.as_mut() {
                    dd.wager = Some(wager);
                    dd.stage = DdStage::Wagering;
                }
                Ok(ServerMessage::WagerSubmitted {
                    player_number: seat,
                    wager,
                })
            })
            .await?
    }

    /// Daily Double: reveal the clue text now that the wager is locked in.
    pub async fn show_dd_clue(&self, game_id: &str) -> Result<ServerMessage, GameError> {
        let snapshot = self.check_active(game_id).await?;
        let clue_id = snapshot.current_clue.ok_or(GameError::NotActive)?;
        let episode = self.catalog.get_episode(snapshot.episode_id).await?;
        let (_, clue) = episode.find_clue(clue_id).ok_or(GameError::InvalidClue { clue_id })?;
        let question = clue.question.clone();
        let answer = clue.answer.clone();

        self.ephemeral
            .with_game(game_id, |state| {
                if let Some(dd) = state.dd_state.as_mut() {
                    dd.stage = DdStage::Answering;
                }
            })
            .await?;

        Ok(ServerMessage::DdClueShown { question, answer })
    }

    /// Daily Double: the wagerer's spoken answer, stored for host judgment.
    pub async fn submit_dd_answer(&self, game_id: &str, seat: Seat, answer: String) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        let broadcast_answer = answer.clone();
        self.ephemeral
            .with_game(game_id, move |state| {
                if let Some(dd) = state.dd_state.as_mut() {
                    dd.answer = Some(answer);
                }
            })
            .await?;
        Ok(ServerMessage::DdAnswerSubmitted {
            player_number: seat,
            answer: broadcast_answer,
        })
    }

    /// Daily Double: host judges the wagerer's answer, applying ±wager.
    pub async fn judge_dd_answer(&self, game_id: &str, seat: Seat, correct: bool) -> Result<ServerMessage, GameError> {
        let clue_id = self.check_active(game_id).await?.current_clue;
        let new_score = self
            .ephemeral
            .with_game(game_id, move |state| -> Result<i64, GameError> {
                let wager = state
                    .dd_state
                    .as_ref()
                    .and_then(|dd| dd.wager)
                    .ok_or(GameError::NotActive)?;
                let delta = if correct { wager } else { -wager };
                let score = state.scores.entry(seat).or_insert(0);
                *score += delta;
                let new_score = *score;
                if correct {
                    state.current_player = Some(seat);
                }
                if let Some(dd) = state.dd_state.as_mut() {
                    dd.stage = DdStage::Judged;
                }
                Ok(new_score)
            })
            .await??;

        self.persist_score(game_id, seat, new_score).await;
        audit::record(
            self.durable.as_ref(),
            game_id,
            Some(seat),
            ActionKind::JudgeDdAnswer,
            json!({"correct": correct}),
        )
        .await;
        if let Some(clue_id) = clue_id {
            self.record_clue_reveal(game_id, clue_id, Some(seat), correct).await;
        }

        Ok(ServerMessage::DdAnswerJudged {
            player_number: seat,
            correct,
            new_score,
        })
    }

    /// Final Jeopardy: fetches the episode's single final-round clue and
    /// broadcasts only its category name.
    pub async fn start_final_jeopardy(&self, game_id: &str) -> Result<ServerMessage, GameError> {
        let episode_id = self.check_active(game_id).await?.episode_id;
        let episode = self.catalog.get_episode(episode_id).await?;
        let category = episode
            .categories_for(Round::Final)
            .next()
            .ok_or(GameError::InvalidClue { clue_id: 0 })?;
        let category_name = category.name.clone();
        let clue_id = category.clues.first().map(|c| c.id);

        self.ephemeral
            .with_game(game_id, move |state| {
                state.current_round = Round::Final;
                state.fj_state = Some(FinalJeopardyState {
                    stage: FjStage::CategoryShown,
                    clue_id,
                    category: Some(category_name.clone()),
                    ..Default::default()
                });
            })
            .await?;

        Ok(ServerMessage::FjCategoryShown {
            category: category.name.clone(),
        })
    }

    /// Final Jeopardy: one contestant's wager (0 ≤ wager ≤ max(0, score)).
    pub async fn submit_fj_wager(&self, game_id: &str, seat: Seat, wager: i64) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        self.ephemeral
            .with_game(game_id, move |state| -> Result<(), GameError> {
                let score = *state.scores.get(&seat).unwrap_or(&0);
                let maximum = score.max(0);
                if wager < 0 {
                    return Err(GameError::WagerTooLow { wager, minimum: 0 });
                }
                if wager > maximum {
                    return Err(GameError::WagerTooHigh { wager, maximum });
                }
                if let Some(fj) = state.fj_state.as_mut() {
                    fj.wagers.insert(seat, wager);
                }
                Ok(())
            })
            .await??;
        Ok(ServerMessage::FjWagerSubmitted { player_number: seat })
    }

    /// Final Jeopardy: reveal the clue text without starting the timer.
    pub async fn reveal_fj_clue(&self, game_id: &str) -> Result<ServerMessage, GameError> {
        let snapshot = self.check_active(game_id).await?;
        let clue_id = snapshot
            .fj_state
            .as_ref()
            .and_then(|fj| fj.clue_id)
            .ok_or(GameError::NotActive)?;
        let episode = self.catalog.get_episode(snapshot.episode_id).await?;
        let (_, clue) = episode.find_clue(clue_id).ok_or(GameError::InvalidClue { clue_id })?;
        let question = clue.question.clone();
        let answer = clue.answer.clone();

        self.ephemeral
            .with_game(game_id, |state| {
                if let Some(fj) = state.fj_state.as_mut() {
                    fj.stage = FjStage::ClueRevealed;
                }
            })
            .await?;

        Ok(ServerMessage::FjClueRevealed { question, answer })
    }

    /// Final Jeopardy: start the client-rendered 30-second answer timer.
    /// The coordinator never enforces this timer server-side (SPEC_FULL.md §9).
    pub async fn start_fj_timer(&self, game_id: &str) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        self.ephemeral
            .with_game(game_id, |state| {
                if let Some(fj) = state.fj_state.as_mut() {
                    fj.stage = FjStage::TimerRunning;
                }
            })
            .await?;
        Ok(ServerMessage::FjTimerStarted { duration_secs: 30 })
    }

    /// Final Jeopardy: one contestant's written answer.
    pub async fn submit_fj_answer(&self, game_id: &str, seat: Seat, answer: String) -> Result<ServerMessage, GameError> {
        self.check_active(game_id).await?;
        self.ephemeral
            .with_game(game_id, move |state| {
                if let Some(fj) = state.fj_state.as_mut() {
                    fj.answers.insert(seat, answer);
                }
            })
            .await?;
        Ok(ServerMessage::FjAnswerSubmitted { player_number: seat })
    }

    /// Final Jeopardy: host judges one seat's answer. When every seat has
    /// been judged, scores are persisted and the game is marked complete.
    pub async fn judge_fj_answer(&self, game_id: &str, seat: Seat, correct: bool) -> Result<Vec<ServerMessage>, GameError> {
        let roster_size = self.roster_size(game_id).await;
        let clue_id = self
            .check_active(game_id)
            .await?
            .fj_state
            .as_ref()
            .and_then(|fj| fj.clue_id);

        let (new_score, all_judged, scores) = self
            .ephemeral
            .with_game(game_id, move |state| -> Result<(i64, bool, HashMap<Seat, i64>), GameError> {
                let wager = state
                    .fj_state
                    .as_ref()
                    .and_then(|fj| fj.wagers.get(&seat).copied())
                    .unwrap_or(0);
                let delta = if correct { wager } else { -wager };
                let score = state.scores.entry(seat).or_insert(0);
                *score += delta;
                let new_score = *score;
                if let Some(fj) = state.fj_state.as_mut() {
                    fj.judgments.insert(seat, correct);
                }
                let judged_count = state.fj_state.as_ref().map(|fj| fj.judgments.len()).unwrap_or(0);
                let all_judged = roster_size > 0 && judged_count >= roster_size;
                if all_judged {
                    state.status = GameStatus::Completed;
                }
                Ok((new_score, all_judged, state.scores.clone()))
            })
            .await??;

        self.persist_score(game_id, seat, new_score).await;
        audit::record(
            self.durable.as_ref(),
            game_id,
            Some(seat),
            ActionKind::JudgeFjAnswer,
            json!({"correct": correct}),
        )
        .await;
        if let Some(clue_id) = clue_id {
            self.record_clue_reveal(game_id, clue_id, Some(seat), correct).await;
        }

        let mut messages = vec![ServerMessage::FjAnswerJudged {
            player_number: seat,
            correct,
            new_score,
        }];

        if all_judged {
            self.durable
                .set_status(game_id, GameStatus::Completed, Some(chrono::Utc::now()))
                .await
                .ok();
            messages.push(ServerMessage::GameCompleted { scores });
        }

        Ok(messages)
    }

    /// Manual termination: persists scores and marks the game completed.
    /// A no-op on an already-terminal game.
    pub async fn end_game(&self, game_id: &str) -> Result<Option<ServerMessage>, GameError> {
        self.terminate(game_id, GameStatus::Completed, ActionKind::EndGame).await
    }

    /// Manual termination without declaring a winner. A no-op on an
    /// already-terminal game.
    pub async fn abandon_game(&self, game_id: &str) -> Result<Option<ServerMessage>, GameError> {
        self.terminate(game_id, GameStatus::Abandoned, ActionKind::AbandonGame).await
    }

    async fn terminate(
        &self,
        game_id: &str,
        status: GameStatus,
        action: ActionKind,
    ) -> Result<Option<ServerMessage>, GameError> {
        let snapshot = self.ephemeral.snapshot(game_id).await?;
        if self.require_active(&snapshot).await.is_err() {
            return Ok(None);
        }

        let scores = self
            .ephemeral
            .with_game(game_id, move |state| {
                state.status = status;
                state.scores.clone()
            })
            .await?;

        for (&seat, &score) in &scores {
            self.persist_score(game_id, seat, score).await;
        }
        self.durable
            .set_status(game_id, status, Some(chrono::Utc::now()))
            .await
            .ok();
        audit::record(self.durable.as_ref(), game_id, None, action, json!({})).await;

        Ok(Some(match status {
            GameStatus::Completed => ServerMessage::GameCompleted { scores },
            GameStatus::Abandoned => ServerMessage::GameAbandoned {},
            _ => unreachable!("terminate is only called with Completed or Abandoned"),
        }))
    }
}

enum Outcome {
    Resolved { new_score: i64, exhausted: bool },
}
