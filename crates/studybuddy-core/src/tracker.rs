//! The tracking phase: every student's timer plus the session controller.
//!
//! A [`Tracker`] owns one [`TimerState`] per student, keyed by
//! [`StudentId`], together with the students' plans and the set of pending
//! break-over prompts. Ticks replace the whole state map at once, so no
//! student's update observes another's within the same tick.
//!
//! Invalid commands (unknown student, wrong sub-state, finished timer) are
//! no-ops: they return [`CommandOutcome::ignored`] and change nothing.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::effects::Effect;
use crate::error::Result;
use crate::plan::{SessionPlan, Student, StudentId};
use crate::storage::Config;
use crate::timer::{self, EarlyFinish, Expiry, TimerMode, TimerPhase, TimerState};

/// One student's expiry during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub student_id: StudentId,
    pub expiry: Expiry,
}

/// Result of one tick.
///
/// `transitions` lists every student whose clock expired. `effects` is
/// coalesced: at most one sound per tick, and a break-over alert wins over
/// a study-complete ding when both happen together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub transitions: Vec<Transition>,
    pub effects: Vec<Effect>,
}

impl TickOutcome {
    pub fn is_quiet(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Students whose break ran out this tick.
    pub fn breaks_over(&self) -> impl Iterator<Item = &StudentId> {
        self.transitions
            .iter()
            .filter(|t| matches!(t.expiry, Expiry::BreakOver { .. }))
            .map(|t| &t.student_id)
    }
}

/// Result of a controller command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub applied: bool,
    pub effects: Vec<Effect>,
}

impl CommandOutcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    fn applied() -> Self {
        Self {
            applied: true,
            effects: Vec::new(),
        }
    }

    fn with_effect(effect: Effect) -> Self {
        Self {
            applied: true,
            effects: vec![effect],
        }
    }
}

/// Display snapshot for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentStatus {
    pub id: StudentId,
    pub name: String,
    pub phase: TimerPhase,
    pub mode: TimerMode,
    pub seconds_left: u32,
    pub clock: String,
    /// 1-based.
    pub session_number: usize,
    pub num_sessions: usize,
    pub topic: String,
    pub completed_sessions: usize,
    pub break_over_pending: bool,
}

#[derive(Debug, Clone)]
pub struct Tracker {
    config: Config,
    students: Vec<Student>,
    states: BTreeMap<StudentId, TimerState>,
    pending_prompts: BTreeSet<StudentId>,
}

impl Tracker {
    /// Enter the tracking phase.
    ///
    /// # Errors
    ///
    /// Returns an error if the config or the plan is invalid.
    pub fn new(config: Config, plan: SessionPlan) -> Result<Self> {
        config.validate()?;
        plan.validate(&config)?;

        let initial = TimerState::initial(&config);
        let states = plan
            .students
            .iter()
            .map(|s| (s.id.clone(), initial))
            .collect();

        info!(
            students = plan.students.len(),
            sessions = config.num_sessions,
            "tracking phase started"
        );
        Ok(Self {
            config,
            students: plan.students,
            states,
            pending_prompts: BTreeSet::new(),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id.as_str() == id)
    }

    pub fn state(&self, id: &str) -> Option<&TimerState> {
        self.states.get(id)
    }

    pub fn states(&self) -> &BTreeMap<StudentId, TimerState> {
        &self.states
    }

    pub fn is_break_over_pending(&self, id: &str) -> bool {
        self.pending_prompts.contains(id)
    }

    pub fn pending_prompts(&self) -> impl Iterator<Item = &StudentId> {
        self.pending_prompts.iter()
    }

    /// Every student is done. Recomputed on each call.
    pub fn all_finished(&self) -> bool {
        self.states.values().all(|s| s.is_session_finished)
    }

    pub fn phase(&self, id: &str) -> Option<TimerPhase> {
        self.states.get(id).map(|s| s.phase())
    }

    pub fn status(&self) -> Vec<StudentStatus> {
        self.students
            .iter()
            .filter_map(|student| {
                let state = self.states.get(&student.id)?;
                let topic = match state.mode {
                    TimerMode::Study => student
                        .topic(state.current_session_index)
                        .unwrap_or("Free Time")
                        .to_string(),
                    TimerMode::Break => "Relax & Recharge".to_string(),
                };
                Some(StudentStatus {
                    id: student.id.clone(),
                    name: student.name.clone(),
                    phase: state.phase(),
                    mode: state.mode,
                    seconds_left: state.seconds_left,
                    clock: state.clock(),
                    session_number: state.current_session_index + 1,
                    num_sessions: self.config.num_sessions as usize,
                    topic,
                    completed_sessions: student.completed_count(),
                    break_over_pending: self.pending_prompts.contains(&student.id),
                })
            })
            .collect()
    }

    // ── Clock ────────────────────────────────────────────────────────

    /// Advance every student by one second.
    pub fn tick(&mut self) -> TickOutcome {
        let mut transitions = Vec::new();
        let next: BTreeMap<StudentId, TimerState> = self
            .states
            .iter()
            .map(|(id, state)| {
                let (next, expiry) = timer::tick(state);
                if let Some(expiry) = expiry {
                    transitions.push(Transition {
                        student_id: id.clone(),
                        expiry,
                    });
                }
                (id.clone(), next)
            })
            .collect();
        self.states = next;

        let mut study_completed = false;
        let mut break_over = false;
        for t in &transitions {
            match t.expiry {
                Expiry::StudyComplete { session_index } => {
                    self.mark_completed(&t.student_id, session_index);
                    study_completed = true;
                }
                Expiry::BreakOver { .. } => {
                    self.pending_prompts.insert(t.student_id.clone());
                    break_over = true;
                }
            }
            debug!(student = %t.student_id, expiry = ?t.expiry, "timer expired");
        }

        let effects = if break_over {
            vec![self.alert_effect()]
        } else if study_completed {
            vec![Effect::PlayDing]
        } else {
            Vec::new()
        };
        TickOutcome {
            transitions,
            effects,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn toggle_run(&mut self, id: &str) -> CommandOutcome {
        let Some(next) = self.states.get(id).and_then(timer::toggle_run) else {
            return CommandOutcome::ignored();
        };
        debug!(student = id, running = next.is_running, "toggled");
        self.replace(id, next);
        CommandOutcome::applied()
    }

    pub fn start_break(&mut self, id: &str) -> CommandOutcome {
        let Some(next) = self
            .states
            .get(id)
            .and_then(|s| timer::start_break(s, &self.config))
        else {
            return CommandOutcome::ignored();
        };
        debug!(student = id, seconds = next.seconds_left, "break started");
        self.replace(id, next);
        CommandOutcome::applied()
    }

    pub fn finish_early(&mut self, id: &str) -> CommandOutcome {
        let Some((next, outcome)) = self
            .states
            .get(id)
            .and_then(|s| timer::finish_early(s, &self.config))
        else {
            return CommandOutcome::ignored();
        };
        debug!(student = id, outcome = ?outcome, "finished early");
        self.replace(id, next);

        match outcome {
            EarlyFinish::StudyEnded { session_index } => {
                if let Some(sid) = self.key(id) {
                    self.mark_completed(&sid, session_index);
                }
                CommandOutcome::with_effect(Effect::PlayDing)
            }
            EarlyFinish::BreakSkipped { .. } | EarlyFinish::AllSessionsDone => {
                self.pending_prompts.remove(id);
                CommandOutcome::applied()
            }
        }
    }

    /// Dismiss the break-over prompt and start the next session.
    pub fn acknowledge_break_over(&mut self, id: &str) -> CommandOutcome {
        if !self.pending_prompts.remove(id) {
            return CommandOutcome::ignored();
        }
        let Some(state) = self.states.get(id) else {
            return CommandOutcome::ignored();
        };
        let next = timer::next_session(state, &self.config, true);
        debug!(
            student = id,
            session = next.current_session_index,
            finished = next.is_session_finished,
            "break over acknowledged"
        );
        self.replace(id, next);
        CommandOutcome::applied()
    }

    /// Leave the tracking phase, discarding every timer.
    pub fn reset(&mut self) {
        info!("tracking phase reset");
        self.states.clear();
        self.pending_prompts.clear();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn key(&self, id: &str) -> Option<StudentId> {
        self.states.get_key_value(id).map(|(k, _)| k.clone())
    }

    fn replace(&mut self, id: &str, next: TimerState) {
        if let Some(state) = self.states.get_mut(id) {
            *state = next;
        }
    }

    fn mark_completed(&mut self, id: &StudentId, session_index: usize) {
        if let Some(student) = self.students.iter_mut().find(|s| &s.id == id) {
            if student.mark_completed(session_index) {
                debug!(student = %id, session = session_index, "session completed");
            }
        }
    }

    fn alert_effect(&self) -> Effect {
        let (sound, custom_data) = self.config.alert_sound();
        Effect::PlayAlertSound {
            sound,
            custom_data: custom_data.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanEntry;
    use crate::storage::SoundType;

    fn config(kids: u32, sessions: u32) -> Config {
        Config {
            num_kids: kids,
            num_sessions: sessions,
            study_duration_minutes: 1,
            break_duration_minutes: 1,
            ..Config::default()
        }
    }

    fn tracker(names: &[&str], sessions: u32) -> Tracker {
        let entries = names.iter().map(|n| PlanEntry {
            name: n.to_string(),
            topics: (0..sessions).map(|i| format!("Topic {i}")).collect(),
        });
        Tracker::new(
            config(names.len() as u32, sessions),
            SessionPlan::from_entries(entries),
        )
        .unwrap()
    }

    fn ticks(t: &mut Tracker, n: usize) -> Vec<TickOutcome> {
        (0..n).map(|_| t.tick()).collect()
    }

    #[test]
    fn new_rejects_invalid_plan() {
        let plan = SessionPlan::from_entries([PlanEntry {
            name: "Ann".into(),
            topics: vec!["Math".into()],
        }]);
        assert!(Tracker::new(config(1, 2), plan.clone()).is_err());
        assert!(Tracker::new(config(0, 1), plan).is_err());
    }

    #[test]
    fn every_student_starts_running() {
        let t = tracker(&["Ann", "Ben"], 2);
        assert_eq!(t.states().len(), 2);
        for state in t.states().values() {
            assert_eq!(*state, TimerState::initial(t.config()));
        }
        assert!(!t.all_finished());
    }

    #[test]
    fn study_expiry_marks_session_and_dings() {
        let mut t = tracker(&["Ann"], 2);
        let outcomes = ticks(&mut t, 60);
        assert!(outcomes[..59].iter().all(TickOutcome::is_quiet));
        let last = &outcomes[59];
        assert_eq!(last.effects, vec![Effect::PlayDing]);
        assert_eq!(t.phase("kid-0"), Some(TimerPhase::AwaitingBreak));
        assert!(t.student("kid-0").unwrap().sessions[0].completed);
    }

    #[test]
    fn break_expiry_raises_prompt_and_alert() {
        let mut t = tracker(&["Ann"], 2);
        ticks(&mut t, 60);
        assert!(t.start_break("kid-0").applied);
        let outcomes = ticks(&mut t, 60);
        assert_eq!(
            outcomes[59].effects,
            vec![Effect::PlayAlertSound {
                sound: SoundType::Classic,
                custom_data: None
            }]
        );
        assert!(t.is_break_over_pending("kid-0"));
        assert_eq!(t.phase("kid-0"), Some(TimerPhase::BreakOver));
    }

    #[test]
    fn paused_student_does_not_move() {
        let mut t = tracker(&["Ann", "Ben"], 1);
        t.toggle_run("kid-1");
        ticks(&mut t, 10);
        assert_eq!(t.state("kid-0").unwrap().seconds_left, 50);
        assert_eq!(t.state("kid-1").unwrap().seconds_left, 60);
    }

    #[test]
    fn start_break_ignored_while_running() {
        let mut t = tracker(&["Ann"], 1);
        let before = *t.state("kid-0").unwrap();
        assert_eq!(t.start_break("kid-0"), CommandOutcome::ignored());
        assert_eq!(*t.state("kid-0").unwrap(), before);
    }

    #[test]
    fn unknown_student_is_ignored() {
        let mut t = tracker(&["Ann"], 1);
        assert!(!t.toggle_run("nobody").applied);
        assert!(!t.start_break("nobody").applied);
        assert!(!t.finish_early("nobody").applied);
        assert!(!t.acknowledge_break_over("nobody").applied);
        assert!(t.status().len() == 1);
    }

    #[test]
    fn finish_early_in_study_is_idempotent_on_completion() {
        let mut t = tracker(&["Ann"], 2);
        let first = t.finish_early("kid-0");
        assert_eq!(first.effects, vec![Effect::PlayDing]);
        let second = t.finish_early("kid-0");
        assert!(second.applied);
        assert_eq!(t.student("kid-0").unwrap().completed_count(), 1);
        assert_eq!(t.phase("kid-0"), Some(TimerPhase::AwaitingBreak));
    }

    #[test]
    fn finish_early_in_break_pauses_next_session() {
        let mut t = tracker(&["Ann"], 2);
        t.finish_early("kid-0");
        t.start_break("kid-0");
        let outcome = t.finish_early("kid-0");
        assert!(outcome.effects.is_empty());
        let state = t.state("kid-0").unwrap();
        assert_eq!(state.mode, TimerMode::Study);
        assert_eq!(state.current_session_index, 1);
        assert_eq!(state.seconds_left, 60);
        assert!(!state.is_running);
    }

    #[test]
    fn finish_early_on_last_break_finishes_directly() {
        let mut t = tracker(&["Ann"], 1);
        t.finish_early("kid-0");
        t.start_break("kid-0");
        t.finish_early("kid-0");
        let state = t.state("kid-0").unwrap();
        assert!(state.is_session_finished);
        assert_eq!(state.mode, TimerMode::Break);
        assert!(t.all_finished());
    }

    #[test]
    fn finish_early_clears_pending_prompt() {
        let mut t = tracker(&["Ann"], 2);
        t.finish_early("kid-0");
        t.start_break("kid-0");
        ticks(&mut t, 60);
        assert!(t.is_break_over_pending("kid-0"));
        t.finish_early("kid-0");
        assert!(!t.is_break_over_pending("kid-0"));
        assert!(!t.acknowledge_break_over("kid-0").applied);
    }

    #[test]
    fn toggle_while_awaiting_break_keeps_start_break_available() {
        let mut t = tracker(&["Ann"], 2);
        ticks(&mut t, 60);
        assert!(t.toggle_run("kid-0").applied);
        assert_eq!(t.phase("kid-0"), Some(TimerPhase::AwaitingBreak));

        // A tick at zero while running expires again; nothing else moves.
        let outcome = t.tick();
        assert_eq!(outcome.effects, vec![Effect::PlayDing]);
        assert_eq!(t.phase("kid-0"), Some(TimerPhase::AwaitingBreak));
        assert_eq!(t.student("kid-0").unwrap().completed_count(), 1);

        assert!(t.toggle_run("kid-0").applied);
        assert!(t.start_break("kid-0").applied);
        let state = t.state("kid-0").unwrap();
        assert_eq!(state.mode, TimerMode::Break);
        assert_eq!(state.seconds_left, 60);
        assert!(state.is_running);
    }

    #[test]
    fn toggle_while_break_over_keeps_prompt() {
        let mut t = tracker(&["Ann"], 2);
        t.finish_early("kid-0");
        t.start_break("kid-0");
        ticks(&mut t, 60);
        assert!(t.toggle_run("kid-0").applied);
        assert_eq!(t.phase("kid-0"), Some(TimerPhase::BreakOver));
        assert!(t.is_break_over_pending("kid-0"));

        t.tick();
        assert_eq!(t.phase("kid-0"), Some(TimerPhase::BreakOver));
        assert_eq!(t.pending_prompts().count(), 1);

        assert!(t.acknowledge_break_over("kid-0").applied);
        let state = t.state("kid-0").unwrap();
        assert_eq!(state.current_session_index, 1);
        assert_eq!(state.mode, TimerMode::Study);
        assert!(state.is_running);
    }

    #[test]
    fn acknowledge_requires_pending_prompt() {
        let mut t = tracker(&["Ann"], 2);
        assert!(!t.acknowledge_break_over("kid-0").applied);
        assert_eq!(t.state("kid-0").unwrap().current_session_index, 0);
    }

    #[test]
    fn simultaneous_expiries_coalesce_sounds_but_not_prompts() {
        let mut t = tracker(&["Ann", "Ben", "Cid"], 2);
        // Ann: break of 60s starting now. Ben and Cid keep studying (60s left).
        t.finish_early("kid-0");
        t.start_break("kid-0");
        let outcomes = ticks(&mut t, 60);
        let last = &outcomes[59];

        assert_eq!(last.transitions.len(), 3);
        assert_eq!(
            last.effects,
            vec![Effect::PlayAlertSound {
                sound: SoundType::Classic,
                custom_data: None
            }]
        );
        assert_eq!(
            last.breaks_over().map(StudentId::as_str).collect::<Vec<_>>(),
            vec!["kid-0"]
        );
        assert!(t.student("kid-1").unwrap().sessions[0].completed);
        assert!(t.student("kid-2").unwrap().sessions[0].completed);
    }

    #[test]
    fn two_breaks_expiring_together_both_prompt() {
        let mut t = tracker(&["Ann", "Ben"], 2);
        for id in ["kid-0", "kid-1"] {
            t.finish_early(id);
            t.start_break(id);
        }
        let outcomes = ticks(&mut t, 60);
        assert_eq!(outcomes[59].effects.len(), 1);
        assert_eq!(
            t.pending_prompts().map(StudentId::as_str).collect::<Vec<_>>(),
            vec!["kid-0", "kid-1"]
        );
        assert!(t.acknowledge_break_over("kid-1").applied);
        assert!(t.is_break_over_pending("kid-0"));
    }

    #[test]
    fn finished_student_ignores_everything() {
        let mut t = tracker(&["Ann", "Ben"], 1);
        t.finish_early("kid-0");
        t.start_break("kid-0");
        t.finish_early("kid-0");
        let done = *t.state("kid-0").unwrap();
        assert!(!t.toggle_run("kid-0").applied);
        assert!(!t.start_break("kid-0").applied);
        assert!(!t.finish_early("kid-0").applied);
        ticks(&mut t, 5);
        assert_eq!(*t.state("kid-0").unwrap(), done);
        assert!(!t.all_finished());
    }

    #[test]
    fn custom_alert_carries_payload() {
        let cfg = Config {
            sound_type: SoundType::Custom,
            custom_sound_data: Some("data:audio/mp3;base64,AA".into()),
            ..config(1, 1)
        };
        let plan = SessionPlan::from_entries([PlanEntry {
            name: "Ann".into(),
            topics: vec!["Math".into()],
        }]);
        let mut t = Tracker::new(cfg, plan).unwrap();
        t.finish_early("kid-0");
        t.start_break("kid-0");
        let outcomes = ticks(&mut t, 60);
        assert_eq!(
            outcomes[59].effects,
            vec![Effect::PlayAlertSound {
                sound: SoundType::Custom,
                custom_data: Some("data:audio/mp3;base64,AA".into())
            }]
        );
    }

    #[test]
    fn status_reports_topic_and_progress() {
        let mut t = tracker(&["Ann"], 2);
        ticks(&mut t, 15);
        let status = &t.status()[0];
        assert_eq!(status.name, "Ann");
        assert_eq!(status.clock, "00:45");
        assert_eq!(status.session_number, 1);
        assert_eq!(status.num_sessions, 2);
        assert_eq!(status.topic, "Topic 0");
        assert_eq!(status.phase, TimerPhase::Studying);

        t.finish_early("kid-0");
        t.start_break("kid-0");
        let status = &t.status()[0];
        assert_eq!(status.topic, "Relax & Recharge");
        assert_eq!(status.completed_sessions, 1);
    }

    #[test]
    fn reset_discards_states() {
        let mut t = tracker(&["Ann"], 1);
        t.reset();
        assert!(t.states().is_empty());
        assert!(t.status().is_empty());
        assert!(t.all_finished());
    }
}
