//! Plain-text rendering for the terminal.

use diagnosis_core::RoundCatalog;
use diagnosis_core::model::{Choice, NextRound, Question, Round};
use services::SessionResult;

pub const HELP: &str = "\
  a-h      answer the current question
  n / p    next / previous question
  <number> jump to question <number>
  s        submit (retries a failed submission)
  t        show remaining time
  q        leave the session
  ?        this help";

/// `mm:ss`.
pub fn clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn round_state(round: &Round) -> &'static str {
    if round.is_completed {
        "done"
    } else if round.is_locked() {
        "locked"
    } else {
        "open"
    }
}

pub fn catalog(catalog: &RoundCatalog) -> String {
    let progress = catalog.progress();
    let mut lines = vec![format!(
        "{}: {}/{} rounds completed, average {:.1}%",
        progress.department(),
        catalog.completed_count(),
        progress.total_rounds(),
        progress.average_score()
    )];
    for round in catalog.rounds() {
        let focus = if catalog.default_focus() == Some(round.round_number) {
            " <- next"
        } else {
            ""
        };
        let score = round
            .score
            .map(|s| format!(" score {s}%"))
            .unwrap_or_default();
        lines.push(format!(
            "  [{:>6}] round {:>2}  {:<28} {} questions, {}{score}{focus}",
            round_state(round),
            round.round_number,
            round.focus_area,
            round.total_questions,
            clock(round.time_limit_seconds),
        ));
    }
    if catalog.is_all_complete() {
        lines.push("  every round is complete".to_owned());
    }
    lines.join("\n")
}

pub fn question(index: usize, total: usize, question: &Question, selected: Option<Choice>) -> String {
    let mut lines = vec![format!("Question {}/{}: {}", index + 1, total, question.content())];
    for (option, text) in question.options().iter().enumerate() {
        let marker = match selected {
            Some(choice) if choice.index() == option => '*',
            _ => ' ',
        };
        let label = Choice::new(option).map_or('?', |c| c.label());
        lines.push(format!("  {marker} {label}) {text}"));
    }
    lines.join("\n")
}

pub fn result(result: &SessionResult) -> String {
    let trigger = if result.is_auto_submit {
        "time ran out"
    } else {
        "submitted"
    };
    let mut lines = vec![
        format!(
            "Round {} {trigger}: {}% ({}), {}/{} correct in {}",
            result.round_number,
            result.score,
            result.level,
            result.report.correct_count,
            result.report.total_questions,
            clock(result.elapsed_seconds),
        ),
    ];
    for domain in &result.report.domains {
        let name = if domain.domain.is_empty() {
            "general"
        } else {
            domain.domain.as_str()
        };
        lines.push(format!("  {name}: {}/{}", domain.correct, domain.total));
    }
    lines.push(match result.next_available_round {
        NextRound::Round(round) => format!("Next open round: {round}"),
        NextRound::AllComplete => "Every round is complete.".to_owned(),
    });
    lines.join("\n")
}
