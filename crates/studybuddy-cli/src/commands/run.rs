use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

use studybuddy_core::{
    Commander, Config, IntervalTicker, PhaseEnd, Scheduler, SessionPlan, StudentId,
    StudentStatus, TimerPhase, Tracker,
};

use super::plan::load_plan;
use crate::notifier::TerminalNotifier;

#[derive(Args)]
pub struct RunArgs {
    /// Plan file with every student's topics (.toml or .json)
    #[arg(long)]
    plan: PathBuf,
    /// Print status as JSON
    #[arg(long)]
    json: bool,
    /// Do not ring the terminal bell on alerts
    #[arg(long)]
    quiet: bool,
    /// Tick length in milliseconds
    #[arg(long, default_value = "1000", hide = true)]
    tick_ms: u64,
}

const HELP: &str = "\
commands:
  toggle <student>   start/pause the timer
  break <student>    start the break once study time is up
  skip <student>     mark study complete / end the break early
  next <student>     acknowledge 'break is over' and start the next session
  status             show every student
  reset              abandon the day
  quit               stop without finishing";

enum Input {
    ToggleRun(StudentId),
    StartBreak(StudentId),
    FinishEarly(StudentId),
    Acknowledge(StudentId),
    Status,
    Reset,
    Quit,
    Help,
}

enum Exit {
    PhaseOver,
    Quit,
}

fn parse_input(line: &str, plan: &SessionPlan) -> Result<Input, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err(String::new());
    };
    let rest = parts.collect::<Vec<_>>().join(" ");
    let student = || {
        plan.resolve(&rest)
            .cloned()
            .ok_or_else(|| format!("unknown student: '{rest}'"))
    };

    match verb.to_ascii_lowercase().as_str() {
        "toggle" | "t" | "pause" | "start" => Ok(Input::ToggleRun(student()?)),
        "break" | "b" => Ok(Input::StartBreak(student()?)),
        "skip" | "s" | "done" => Ok(Input::FinishEarly(student()?)),
        "next" | "n" | "ack" => Ok(Input::Acknowledge(student()?)),
        "status" | "st" => Ok(Input::Status),
        "reset" => Ok(Input::Reset),
        "quit" | "q" | "exit" => Ok(Input::Quit),
        "help" | "h" | "?" => Ok(Input::Help),
        other => Err(format!("unknown command: '{other}' (try 'help')")),
    }
}

fn phase_label(phase: TimerPhase) -> &'static str {
    match phase {
        TimerPhase::Studying => "focus",
        TimerPhase::StudyPaused => "focus (paused)",
        TimerPhase::AwaitingBreak => "ready for break",
        TimerPhase::OnBreak => "break",
        TimerPhase::BreakPaused => "break (paused)",
        TimerPhase::BreakOver => "break over",
        TimerPhase::Finished => "done",
    }
}

fn print_status(status: &[StudentStatus], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }
    for s in status {
        println!(
            "{:<12} {:<16} {}  session {}/{}  {}  [{}/{} done]{}",
            s.name,
            phase_label(s.phase),
            s.clock,
            s.session_number,
            s.num_sessions,
            s.topic,
            s.completed_sessions,
            s.num_sessions,
            if s.break_over_pending { "  <- break over" } else { "" },
        );
    }
    Ok(())
}

async fn forward(
    commands: &Commander,
    input: Input,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match input {
        Input::ToggleRun(id) => commands.toggle_run(id).await?,
        Input::StartBreak(id) => commands.start_break(id).await?,
        Input::FinishEarly(id) => commands.finish_early(id).await?,
        Input::Acknowledge(id) => commands.acknowledge_break_over(id).await?,
        Input::Reset => commands.reset().await?,
        Input::Status => print_status(&commands.status().await?, json)?,
        Input::Help => println!("{HELP}"),
        Input::Quit => {}
    }
    Ok(())
}

async fn track(
    tracker: Tracker,
    plan: SessionPlan,
    args: RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (exit_tx, mut exit_rx) = oneshot::channel();
    let handle = Scheduler::new(
        tracker,
        IntervalTicker::new(Duration::from_millis(args.tick_ms.max(1))),
        TerminalNotifier::new(!args.quiet),
    )
    .on_exit(move || {
        // Nobody listening means the CLI is already leaving.
        let _ = exit_tx.send(());
    })
    .spawn();
    let commands = handle.commander();

    println!("{HELP}");
    print_status(&commands.status().await?, args.json)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let exit = loop {
        tokio::select! {
            _ = &mut exit_rx => break Exit::PhaseOver,
            line = lines.next_line() => match line? {
                Some(line) => match parse_input(&line, &plan) {
                    Ok(Input::Quit) => break Exit::Quit,
                    Ok(input) => {
                        // Reset ends the loop; the exit branch picks that up.
                        if let Err(e) = forward(&commands, input, args.json).await {
                            tracing::debug!(error = %e, "command not delivered");
                        }
                    }
                    Err(msg) if msg.is_empty() => {}
                    Err(msg) => println!("{msg}"),
                },
                // Input closed. The status round-trip lets every command
                // already sent land before deciding how the phase ended.
                None => match commands.status().await {
                    Ok(_) => break Exit::Quit,
                    Err(_) => break Exit::PhaseOver,
                },
            },
        }
    };

    let outcome = match exit {
        Exit::Quit => handle.stop().await?,
        Exit::PhaseOver => handle.finished().await?,
    };
    match outcome.end {
        PhaseEnd::AllFinished => {
            print_status(&outcome.tracker.status(), args.json)?;
            println!("All sessions complete! Excellent work today.");
        }
        PhaseEnd::Reset => println!("tracking reset"),
        PhaseEnd::Stopped => println!("stopped"),
    }
    Ok(())
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let plan = load_plan(&args.plan)?;
    let tracker = Tracker::new(config, plan.clone())?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(track(tracker, plan, args));
    // stdin reads run on a blocking thread that never returns on its own.
    runtime.shutdown_background();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use studybuddy_core::PlanEntry;

    fn plan() -> SessionPlan {
        SessionPlan::from_entries([
            PlanEntry {
                name: "Ann".into(),
                topics: vec!["Math".into()],
            },
            PlanEntry {
                name: "Mary Jane".into(),
                topics: vec!["Art".into()],
            },
        ])
    }

    #[test]
    fn parses_student_by_name_or_id() {
        match parse_input("break ann", &plan()) {
            Ok(Input::StartBreak(id)) => assert_eq!(id.as_str(), "kid-0"),
            _ => panic!("expected StartBreak"),
        }
        match parse_input("skip kid-1", &plan()) {
            Ok(Input::FinishEarly(id)) => assert_eq!(id.as_str(), "kid-1"),
            _ => panic!("expected FinishEarly"),
        }
        match parse_input("next Mary Jane", &plan()) {
            Ok(Input::Acknowledge(id)) => assert_eq!(id.as_str(), "kid-1"),
            _ => panic!("expected Acknowledge"),
        }
    }

    #[test]
    fn rejects_unknown_student_and_verb() {
        assert_eq!(
            parse_input("toggle Zed", &plan()).err().as_deref(),
            Some("unknown student: 'Zed'")
        );
        assert!(parse_input("dance Ann", &plan()).is_err());
        assert_eq!(parse_input("   ", &plan()).err().as_deref(), Some(""));
    }

    #[test]
    fn parses_bare_commands() {
        assert!(matches!(parse_input("status", &plan()), Ok(Input::Status)));
        assert!(matches!(parse_input("Q", &plan()), Ok(Input::Quit)));
        assert!(matches!(parse_input("reset", &plan()), Ok(Input::Reset)));
    }

    #[test]
    fn every_phase_has_a_label() {
        assert_eq!(phase_label(TimerPhase::AwaitingBreak), "ready for break");
        assert_eq!(phase_label(TimerPhase::Finished), "done");
    }
}
