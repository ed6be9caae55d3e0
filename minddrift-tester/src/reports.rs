use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    /// Needs fault injection the selected backend cannot provide.
    pub skipped: bool,
    pub sessions_run: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    pub answers_recorded: usize,
    pub guesses: Vec<String>,
}

impl ScenarioResult {
    #[must_use]
    pub fn skipped(name: &str) -> Self {
        Self {
            scenario_name: name.to_string(),
            passed: true,
            skipped: true,
            sessions_run: 0,
            failures: Vec::new(),
            duration: Duration::ZERO,
            answers_recorded: 0,
            guesses: Vec::new(),
        }
    }
}

struct Totals {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
}

impl Totals {
    fn of(results: &[ScenarioResult]) -> Self {
        let skipped = results.iter().filter(|r| r.skipped).count();
        let passed = results.iter().filter(|r| r.passed && !r.skipped).count();
        Self {
            total: results.len(),
            passed,
            failed: results.iter().filter(|r| !r.passed).count(),
            skipped,
        }
    }

    fn success_rate(&self) -> f64 {
        let ran = self.total - self.skipped;
        if ran == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = (self.passed as f64 / ran as f64) * 100.0;
        rate
    }
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Scenario Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "===========================".cyan())?;

    let totals = Totals::of(results);
    writeln!(out, "Total scenarios: {}", totals.total)?;
    writeln!(out, "Passed: {}", totals.passed.to_string().green())?;
    writeln!(out, "Failed: {}", totals.failed.to_string().red())?;
    if totals.skipped > 0 {
        writeln!(out, "Skipped: {}", totals.skipped.to_string().yellow())?;
    }
    writeln!(out, "Success rate: {:.1}%", totals.success_rate())?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.skipped {
            "⏭️  SKIP".yellow()
        } else if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(out, "{} {}", status, result.scenario_name.bold())?;
        if result.skipped {
            writeln!(out, "   Needs the in-memory backend")?;
            writeln!(out)?;
            continue;
        }
        writeln!(
            out,
            "   Sessions: {}, answers recorded: {}",
            result.sessions_run, result.answers_recorded
        )?;
        if !result.guesses.is_empty() {
            writeln!(out, "   Guesses: {}", result.guesses.join(", "))?;
        }
        writeln!(out, "   Time: {:?}", result.duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let ran: Vec<_> = results.iter().filter(|r| !r.skipped).collect();
    if let (Some(fastest), Some(slowest)) = (
        ran.iter().min_by_key(|r| r.duration),
        ran.iter().max_by_key(|r| r.duration),
    ) {
        writeln!(out, "{}", "⚡ Timing Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# MindDrift Scenario Results\n")?;

    let totals = Totals::of(results);
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {}", totals.total)?;
    writeln!(out, "- **Passed**: {}", totals.passed)?;
    writeln!(out, "- **Failed**: {}", totals.failed)?;
    writeln!(out, "- **Skipped**: {}", totals.skipped)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", totals.success_rate())?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.skipped {
            "⏭️"
        } else if result.passed {
            "✅"
        } else {
            "❌"
        };

        writeln!(out, "### {} {}\n", status, result.scenario_name)?;
        if result.skipped {
            writeln!(out, "_Skipped: needs the in-memory backend._\n")?;
            continue;
        }
        writeln!(out, "- **Sessions**: {}", result.sessions_run)?;
        writeln!(out, "- **Answers recorded**: {}", result.answers_recorded)?;
        writeln!(out, "- **Time**: {:?}", result.duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
