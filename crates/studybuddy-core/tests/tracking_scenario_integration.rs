//! Integration tests for a full tracking phase driven tick by tick.
//!
//! Walks one student through both sessions of a short plan and checks the
//! state machine, plan completion flags and effects at every hand-off.

use studybuddy_core::{
    Config, Effect, PlanEntry, SessionPlan, SoundType, TickOutcome, TimerMode, TimerPhase,
    Tracker,
};

fn ann_tracker() -> Tracker {
    let config = Config {
        num_kids: 1,
        num_sessions: 2,
        study_duration_minutes: 1,
        break_duration_minutes: 1,
        sound_type: SoundType::Bell,
        custom_sound_data: None,
    };
    let plan = SessionPlan::from_entries([PlanEntry {
        name: "Ann".into(),
        topics: vec!["Math".into(), "Reading".into()],
    }]);
    Tracker::new(config, plan).unwrap()
}

fn run_ticks(tracker: &mut Tracker, n: usize) -> Vec<Effect> {
    (0..n)
        .map(|_| tracker.tick())
        .flat_map(|outcome: TickOutcome| outcome.effects)
        .collect()
}

fn bell() -> Effect {
    Effect::PlayAlertSound {
        sound: SoundType::Bell,
        custom_data: None,
    }
}

#[test]
fn test_two_session_day_for_one_student() {
    let mut t = ann_tracker();
    let ann = "kid-0";

    // Session 1 study runs out.
    assert_eq!(run_ticks(&mut t, 60), vec![Effect::PlayDing]);
    let state = *t.state(ann).unwrap();
    assert!(state.is_awaiting_break());
    assert_eq!(state.seconds_left, 0);
    assert!(t.student(ann).unwrap().sessions[0].completed);
    assert!(!t.student(ann).unwrap().sessions[1].completed);

    // Nothing moves while waiting for the break.
    assert!(run_ticks(&mut t, 5).is_empty());
    assert_eq!(*t.state(ann).unwrap(), state);

    assert!(t.start_break(ann).applied);
    let state = t.state(ann).unwrap();
    assert_eq!(state.mode, TimerMode::Break);
    assert_eq!(state.seconds_left, 60);
    assert!(state.is_running);

    // Break runs out: prompt raised, alert played.
    assert_eq!(run_ticks(&mut t, 60), vec![bell()]);
    assert!(t.is_break_over_pending(ann));
    assert_eq!(t.phase(ann), Some(TimerPhase::BreakOver));

    assert!(t.acknowledge_break_over(ann).applied);
    let state = t.state(ann).unwrap();
    assert_eq!(state.mode, TimerMode::Study);
    assert_eq!(state.current_session_index, 1);
    assert_eq!(state.seconds_left, 60);
    assert!(state.is_running);
    assert!(!t.is_break_over_pending(ann));

    // Session 2: study expires, finish early again is harmless, break, prompt.
    assert_eq!(run_ticks(&mut t, 60), vec![Effect::PlayDing]);
    assert_eq!(t.finish_early(ann).effects, vec![Effect::PlayDing]);
    assert!(t.start_break(ann).applied);
    assert_eq!(run_ticks(&mut t, 60), vec![bell()]);
    assert!(!t.all_finished());

    assert!(t.acknowledge_break_over(ann).applied);
    let state = t.state(ann).unwrap();
    assert!(state.is_session_finished);
    assert!(!state.is_running);
    assert_eq!(state.current_session_index, 1);
    assert_eq!(t.student(ann).unwrap().completed_count(), 2);
    assert!(t.all_finished());
}

#[test]
fn test_finished_student_is_frozen() {
    let mut t = ann_tracker();
    let ann = "kid-0";
    for _ in 0..2 {
        t.finish_early(ann);
        t.start_break(ann);
        t.finish_early(ann);
    }
    let done = *t.state(ann).unwrap();
    assert!(done.is_session_finished);

    assert!(run_ticks(&mut t, 120).is_empty());
    assert!(!t.toggle_run(ann).applied);
    assert!(!t.start_break(ann).applied);
    assert!(!t.finish_early(ann).applied);
    assert!(!t.acknowledge_break_over(ann).applied);
    assert_eq!(*t.state(ann).unwrap(), done);
}

#[test]
fn test_skipping_break_leaves_next_study_paused() {
    let mut t = ann_tracker();
    let ann = "kid-0";
    run_ticks(&mut t, 60);
    t.start_break(ann);
    run_ticks(&mut t, 10);
    t.finish_early(ann);

    let state = *t.state(ann).unwrap();
    assert_eq!(state.phase(), TimerPhase::StudyPaused);
    assert_eq!(state.current_session_index, 1);
    assert!(run_ticks(&mut t, 10).is_empty());
    assert_eq!(t.state(ann).unwrap().seconds_left, 60);

    t.toggle_run(ann);
    run_ticks(&mut t, 10);
    assert_eq!(t.state(ann).unwrap().seconds_left, 50);
}
