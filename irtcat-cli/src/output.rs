/// Output formatting: terminal tables and JSON.
use irtcat_core::{AbilityEstimate, EstimationTrace, ItemIndex, RecoverySummary, SessionOutcome};
use serde::Serialize;

use crate::bail;
use crate::study::LoadedStudy;

#[derive(Serialize)]
struct JsonAnswer<'a> {
    position: usize,
    item: ItemIndex,
    text: &'a str,
    category: u8,
}

#[derive(Serialize)]
struct JsonSession<'a> {
    study: &'a str,
    estimate: &'a AbilityEstimate,
    answers: Vec<JsonAnswer<'a>>,
}

#[derive(Serialize)]
struct JsonEstimate<'a> {
    estimate: &'a AbilityEstimate,
    trace: &'a EstimationTrace,
    next_item: Option<ItemIndex>,
}

#[derive(Serialize)]
struct JsonSimulation<'a> {
    study: &'a str,
    failed_sessions: usize,
    results: &'a [RecoverySummary],
}

fn print_pretty<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| bail(format!("Failed to serialize output: {e}")));
    println!("{json}");
}

fn estimate_line(estimate: &AbilityEstimate) -> String {
    format!(
        "theta = {:.4}  SE = {:.4}  ({}, {} iterations)",
        estimate.theta,
        estimate.standard_error,
        if estimate.converged { "converged" } else { "not converged" },
        estimate.iterations,
    )
}

/// Print a finished session as a formatted terminal table.
pub fn print_session_table(study: &LoadedStudy, outcome: &SessionOutcome) {
    let text_width = outcome
        .administered
        .iter()
        .map(|&i| study.text(i).chars().count().min(60))
        .max()
        .unwrap_or(4)
        .max(4); // at least "Item"

    println!(" # | Index | {:<text_width$} | Answer", "Item");
    println!("---|-------|-{}-|-------", "-".repeat(text_width));

    for (pos, response) in outcome.responses.iter().enumerate() {
        let text: String = study.text(response.item_index).chars().take(60).collect();
        println!(
            "{:>2} | {:>5} | {:<text_width$} | {:>6}",
            pos + 1,
            response.item_index,
            text,
            response.category,
        );
    }

    println!("\n{} items administered", outcome.administered.len());
    println!("{}", estimate_line(&outcome.estimate));
}

/// Print a finished session as JSON.
pub fn print_session_json(study: &LoadedStudy, outcome: &SessionOutcome) {
    let answers = outcome
        .responses
        .iter()
        .enumerate()
        .map(|(pos, r)| JsonAnswer {
            position: pos + 1,
            item: r.item_index,
            text: study.text(r.item_index),
            category: r.category,
        })
        .collect();

    print_pretty(&JsonSession {
        study: &study.name,
        estimate: &outcome.estimate,
        answers,
    });
}

/// Print a one-shot estimate with its iteration trace.
pub fn print_estimate_table(estimate: &AbilityEstimate, trace: &EstimationTrace, next_item: Option<ItemIndex>) {
    println!("Method: {:?}", trace.method);
    if !trace.steps.is_empty() {
        println!("Iter |    Theta |    Score | Information |     Step |       SE");
        println!("-----|----------|----------|-------------|----------|---------");
        for s in &trace.steps {
            let step = s.step.map_or_else(|| "-".to_string(), |v| format!("{v:.5}"));
            println!(
                "{:>4} | {:>8.4} | {:>8.4} | {:>11.4} | {:>8} | {:>8.4}",
                s.iteration, s.theta, s.score, s.information, step, s.standard_error,
            );
        }
        println!();
    }
    println!("{}", estimate_line(estimate));
    match next_item {
        Some(item) => println!("Next adaptive item: {item}"),
        None => println!("Next adaptive item: none (pool exhausted)"),
    }
}

pub fn print_estimate_json(estimate: &AbilityEstimate, trace: &EstimationTrace, next_item: Option<ItemIndex>) {
    print_pretty(&JsonEstimate { estimate, trace, next_item });
}

/// Print simulation results, one row per true theta.
pub fn print_simulation_table(summaries: &[RecoverySummary], failed_sessions: usize) {
    println!(" True θ | Reps | Mean θ |    Bias |   RMSE | Mean SE | Items | Converged");
    println!("--------|------|--------|---------|--------|---------|-------|----------");
    for s in summaries {
        println!(
            "{:>7.2} | {:>4} | {:>6.3} | {:>7.3} | {:>6.3} | {:>7.3} | {:>5.1} | {:>8.0}%",
            s.true_theta,
            s.replications,
            s.mean_theta,
            s.bias,
            s.rmse,
            s.mean_standard_error,
            s.mean_items,
            s.converged_rate * 100.0,
        );
    }
    if failed_sessions > 0 {
        println!("\n{failed_sessions} sessions failed and are not included");
    }
}

pub fn print_simulation_json(study: &str, summaries: &[RecoverySummary], failed_sessions: usize) {
    print_pretty(&JsonSimulation {
        study,
        failed_sessions,
        results: summaries,
    });
}
