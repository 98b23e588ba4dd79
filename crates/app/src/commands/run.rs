//! Interactive session loop: questions on stdout, commands on stdin, the
//! countdown running on its own task.

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use diagnosis_core::Clock;
use diagnosis_core::model::{Choice, NextRound, RoundNumber};
use services::session::SessionFailure;
use services::{
    AssessmentService, SessionError, SessionHandle, SessionResult, SessionSnapshot, SessionStatus,
    SubmitOutcome, TokioScheduler,
};
use tokio::sync::mpsc;

use super::rounds::load_catalog;
use crate::context::{self, TargetArgs, Workspace};
use crate::render;

pub async fn execute(
    target: &TargetArgs,
    round: Option<u8>,
    settings: Option<&Path>,
) -> Result<()> {
    let settings = context::load_settings(settings)?;
    let workspace = Workspace::open(target)?;
    let service = AssessmentService::from_storage(
        Clock::system(),
        workspace.learner.clone(),
        &workspace.storage,
    )
    .with_settings(settings.clone());
    let mut input = spawn_input();

    let mut requested = round
        .map(|n| RoundNumber::new(n).with_context(|| format!("invalid round {n}")))
        .transpose()?;

    loop {
        let catalog = load_catalog(&workspace).await?;
        let Some(round) = requested.take().or(catalog.default_focus()) else {
            println!("{}", render::catalog(&catalog));
            return Ok(());
        };

        let handle = match service.start_shared(&workspace.department, round).await {
            Ok(handle) => handle,
            Err(SessionError::NotAvailable {
                round,
                max_available,
            }) => {
                println!("Round {round} is locked; the furthest open round is {max_available}.");
                continue;
            }
            Err(err) if err.is_retryable() => {
                println!("{err}");
                if !confirm(&mut input, "Retry?").await {
                    return Ok(());
                }
                requested = Some(round);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let (focus, time_limit, total) = handle.read(|s| {
            (
                s.focus_area().to_owned(),
                s.time_limit_seconds(),
                s.questions().len(),
            )
        })?;
        println!(
            "Round {round}: {focus} ({total} questions, {}). Type ? for help.",
            render::clock(time_limit)
        );
        handle.run_clock(&TokioScheduler, settings.tick_period())?;

        let Some(result) = drive(&handle, &mut input).await? else {
            println!("Session left; nothing was submitted.");
            return Ok(());
        };
        println!("{}", render::result(&result));
        if result.next_available_round == NextRound::AllComplete {
            return Ok(());
        }
        if !confirm(&mut input, "Continue with the next round?").await {
            return Ok(());
        }
    }
}

/// Stdin is read on a plain thread: a blocking read inside the runtime would
/// hold up shutdown.
fn spawn_input() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line.trim().to_owned()).is_err() {
                break;
            }
        }
    });
    rx
}

async fn confirm(input: &mut mpsc::UnboundedReceiver<String>, prompt: &str) -> bool {
    println!("{prompt} [y/N]");
    input
        .recv()
        .await
        .is_some_and(|line| line.eq_ignore_ascii_case("y") || line.eq_ignore_ascii_case("yes"))
}

enum Event {
    Update(SessionSnapshot),
    Input(String),
    Closed,
}

enum Flow {
    Continue,
    Finished(SessionResult),
    Quit,
}

/// What has already been announced for the running session.
#[derive(Default)]
struct Announced {
    low_time: bool,
    remaining: Option<u32>,
    errored: bool,
}

async fn drive(
    handle: &SessionHandle,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<Option<SessionResult>> {
    let mut updates = handle.subscribe();
    let mut announced = Announced::default();
    show_current(handle)?;

    loop {
        let event = tokio::select! {
            changed = updates.changed() => match changed {
                Ok(()) => Event::Update(updates.borrow_and_update().clone()),
                Err(_) => Event::Closed,
            },
            line = input.recv() => line.map_or(Event::Closed, Event::Input),
        };

        let flow = match event {
            Event::Update(snapshot) => on_update(handle, &snapshot, &mut announced)?,
            Event::Input(line) => on_input(handle, &line, input).await?,
            Event::Closed => Flow::Quit,
        };
        match flow {
            Flow::Continue => {}
            Flow::Finished(result) => return Ok(Some(result)),
            Flow::Quit => {
                handle.abandon()?;
                return Ok(None);
            }
        }
    }
}

fn on_update(
    handle: &SessionHandle,
    snapshot: &SessionSnapshot,
    announced: &mut Announced,
) -> Result<Flow> {
    match snapshot.status {
        SessionStatus::Completed => {
            if snapshot.is_auto_submit == Some(true) {
                println!("Time is up; your answers were submitted.");
            }
            return finished(handle);
        }
        SessionStatus::Errored => {
            if !announced.errored {
                announced.errored = true;
                let failure = handle.read(|s| match s.failure() {
                    Some(SessionFailure::Load(reason) | SessionFailure::Submit(reason)) => {
                        Some(reason.clone())
                    }
                    None => None,
                })?;
                println!(
                    "Submission failed: {}. Your answers are kept; type s to retry.",
                    failure.as_deref().unwrap_or("unknown error")
                );
            }
            return Ok(Flow::Continue);
        }
        SessionStatus::InProgress => {}
        SessionStatus::Submitting => {
            announced.errored = false;
            return Ok(Flow::Continue);
        }
        _ => return Ok(Flow::Continue),
    }

    let remaining = snapshot.remaining_seconds;
    if snapshot.low_on_time && !announced.low_time {
        announced.low_time = true;
        announced.remaining = Some(remaining);
        println!(
            "Only {} left, {} question(s) unanswered.",
            render::clock(remaining),
            snapshot.unanswered()
        );
    } else if remaining > 0 && remaining % 60 == 0 && announced.remaining != Some(remaining) {
        announced.remaining = Some(remaining);
        println!("{} left.", render::clock(remaining));
    }
    Ok(Flow::Continue)
}

async fn on_input(
    handle: &SessionHandle,
    line: &str,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<Flow> {
    let snapshot = handle.snapshot();
    match line {
        "" => show_current(handle)?,
        "?" => println!("{}", render::HELP),
        "q" => return Ok(Flow::Quit),
        "t" => println!(
            "{} left, {}/{} answered.",
            render::clock(snapshot.remaining_seconds),
            snapshot.answered,
            snapshot.total
        ),
        "n" => go_to(handle, snapshot.current_index + 1)?,
        "p" => go_to(handle, snapshot.current_index.saturating_sub(1))?,
        "s" => return submit(handle, &snapshot, input).await,
        other => {
            if let Ok(number) = other.parse::<usize>() {
                match number.checked_sub(1) {
                    Some(index) => go_to(handle, index)?,
                    None => println!("Questions are numbered from 1."),
                }
            } else if let Ok(choice) = other.parse::<Choice>() {
                answer(handle, choice, &snapshot)?;
            } else {
                println!("Unknown command {other:?}; type ? for help.");
            }
        }
    }
    Ok(Flow::Continue)
}

fn answer(handle: &SessionHandle, choice: Choice, snapshot: &SessionSnapshot) -> Result<()> {
    let Some(question_id) = handle.read(|s| s.current_question().map(|q| q.id()))? else {
        println!("No question to answer.");
        return Ok(());
    };
    if report(handle.answer(question_id, choice))?.is_none() {
        return Ok(());
    }

    let next = snapshot.current_index + 1;
    if next < snapshot.total {
        go_to(handle, next)
    } else {
        let unanswered = handle.snapshot().unanswered();
        if unanswered == 0 {
            println!("All questions answered; type s to submit.");
        } else {
            println!("Last question answered; {unanswered} still unanswered. Type s to submit.");
        }
        Ok(())
    }
}

async fn submit(
    handle: &SessionHandle,
    snapshot: &SessionSnapshot,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<Flow> {
    if snapshot.status == SessionStatus::InProgress && handle.requires_confirmation()? {
        let prompt = format!(
            "{} of {} questions are unanswered. Submit anyway?",
            snapshot.unanswered(),
            snapshot.total
        );
        if !confirm(input, &prompt).await {
            return Ok(Flow::Continue);
        }
    }

    match handle.submit(true).await {
        Ok(SubmitOutcome::Completed(result)) => Ok(Flow::Finished(result)),
        Ok(SubmitOutcome::Skipped {
            status: SessionStatus::Completed,
        }) => finished(handle),
        Ok(SubmitOutcome::Skipped { status }) => {
            println!("Already {status}.");
            Ok(Flow::Continue)
        }
        // The failure is announced from the `Errored` snapshot.
        Err(err) if err.is_retryable() => Ok(Flow::Continue),
        Err(err) => {
            report::<()>(Err(err))?;
            Ok(Flow::Continue)
        }
    }
}

fn finished(handle: &SessionHandle) -> Result<Flow> {
    let result = handle
        .read(|s| s.result().cloned())?
        .context("completed session has no result")?;
    Ok(Flow::Finished(result))
}

fn go_to(handle: &SessionHandle, index: usize) -> Result<()> {
    if report(handle.navigate(index))?.is_some() {
        show_current(handle)?;
    }
    Ok(())
}

fn show_current(handle: &SessionHandle) -> Result<()> {
    let view = handle.read(|s| {
        s.current_question().map(|q| {
            render::question(
                s.current_index(),
                s.questions().len(),
                q,
                s.ledger().choice_for(q.id()),
            )
        })
    })?;
    if let Some(view) = view {
        println!("{view}");
    }
    Ok(())
}

/// Print a rejected input and carry on; a poisoned session ends the run.
fn report<T>(result: Result<T, SessionError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SessionError::StatePoisoned) => Err(SessionError::StatePoisoned.into()),
        Err(err) => {
            println!("{err}");
            Ok(None)
        }
    }
}
