use clap::ValueEnum;
use colored::Colorize;
use log::{info, warn};
use minddrift_game::{BackendGateway, GameConfig};
use std::rc::Rc;
use std::time::Instant;

use crate::backend::{Endpoint, MemoryBackend};
use crate::driver::{DriveOptions, SessionDriver, SessionSummary};
use crate::http::HttpGateway;
use crate::reports::ScenarioResult;
use crate::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// In-process backend with fault injection (fast, deterministic)
    Memory,
    /// Live guessing service reachable over HTTP
    Http,
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub backend: BackendKind,
    pub base_url: String,
    pub config: GameConfig,
    pub drive: DriveOptions,
    pub verbose: bool,
}

/// Play every session of `scenario` and check its expectations.
///
/// Must run inside a `tokio::task::LocalSet`.
pub async fn run_scenario(scenario: &Scenario, options: &RunnerOptions) -> ScenarioResult {
    if options.backend == BackendKind::Http && scenario.needs_memory_backend() {
        warn!(
            "{} injects faults and only runs against the memory backend",
            scenario.name
        );
        return ScenarioResult::skipped(scenario.name);
    }

    let memory = Rc::new(scenario.backend());
    let gateway: Rc<dyn BackendGateway> = match options.backend {
        BackendKind::Memory => memory.clone(),
        BackendKind::Http => {
            let http = HttpGateway::new(options.base_url.clone());
            info!("{} drives against {}", scenario.name, http.base_url());
            Rc::new(http)
        }
    };
    let driver = SessionDriver::new(gateway, scenario.config(&options.config), options.drive);

    let started = Instant::now();
    let mut summaries: Vec<SessionSummary> = Vec::with_capacity(scenario.sessions.len());
    let mut failures = Vec::new();
    for (index, plan) in scenario.sessions.iter().enumerate() {
        match driver.run(plan).await {
            Ok(summary) => {
                if options.verbose {
                    println!(
                        "   {} session {}: {} answers, ended as {}",
                        "•".cyan(),
                        index + 1,
                        summary.answers.len(),
                        summary.final_state
                    );
                }
                summaries.push(summary);
            }
            Err(err) => {
                failures.push(format!("session {} aborted: {err:#}", index + 1));
                break;
            }
        }
    }
    if options.verbose && options.backend == BackendKind::Memory {
        print_backend_calls(&memory);
    }
    if failures.is_empty()
        && let Some(failure) = scenario.evaluate(&summaries)
    {
        failures.push(failure);
    }

    let result = ScenarioResult {
        scenario_name: scenario.name.to_string(),
        passed: failures.is_empty(),
        skipped: false,
        sessions_run: summaries.len(),
        failures,
        duration: started.elapsed(),
        answers_recorded: summaries.iter().map(|s| s.answers.len()).sum(),
        guesses: summaries
            .iter()
            .flat_map(|s| s.guesses.iter().map(|g| g.label.clone()))
            .collect(),
    };
    info!(
        "{}: {} in {:?}",
        result.scenario_name,
        if result.passed { "passed" } else { "failed" },
        result.duration
    );
    result
}

fn print_backend_calls(backend: &MemoryBackend) {
    let counts: Vec<String> = [
        Endpoint::StartGame,
        Endpoint::Predict,
        Endpoint::ContinueGame,
        Endpoint::ConfirmSuccess,
    ]
    .iter()
    .map(|endpoint| format!("{endpoint} x{}", backend.call_count(*endpoint)))
    .collect();
    println!(
        "   {} backend calls: {}; verified guesses cached: {}",
        "•".cyan(),
        counts.join(", "),
        backend.cached_guesses()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{catalog, find_scenario};
    use tokio::task::LocalSet;

    fn options(backend: BackendKind) -> RunnerOptions {
        RunnerOptions {
            backend,
            base_url: "http://127.0.0.1:9".to_string(),
            config: GameConfig::default(),
            drive: DriveOptions::default(),
            verbose: false,
        }
    }

    #[tokio::test]
    async fn every_scenario_passes_on_the_memory_backend() {
        LocalSet::new()
            .run_until(async {
                for scenario in catalog() {
                    let result = run_scenario(&scenario, &options(BackendKind::Memory)).await;
                    assert!(
                        result.passed,
                        "{} failed: {:?}",
                        scenario.name, result.failures
                    );
                    assert_eq!(result.sessions_run, scenario.sessions.len());
                }
            })
            .await;
    }

    #[tokio::test]
    async fn fault_scenarios_are_skipped_over_http() {
        let scenario = find_scenario("prediction-failure").unwrap();
        let result = run_scenario(&scenario, &options(BackendKind::Http)).await;
        assert!(result.skipped);
        assert!(result.passed);
        assert_eq!(result.sessions_run, 0);
    }

    #[tokio::test]
    async fn unreachable_backend_fails_the_scenario() {
        LocalSet::new()
            .run_until(async {
                let scenario = find_scenario("smoke").unwrap();
                let result = run_scenario(&scenario, &options(BackendKind::Http)).await;
                assert!(!result.passed);
                assert!(!result.failures.is_empty());
            })
            .await;
    }
}
