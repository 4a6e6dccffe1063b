//! Console output formatter for execution results, chains and the
//! operational snapshot

use colored::{ColoredString, Colorize};
use conductor_application::{GroupSweep, OperationalSnapshot, ToolOutput};
use conductor_domain::{
    ChainOutcome, CircuitState, StepRecord, StepStatus, ToolDescriptor, ToolError,
    util::truncate_str,
};
use serde::Serialize;
use serde_json::{Value, json};

/// Longest tool output shown inline before it is cut
const PREVIEW_BYTES: usize = 400;

/// Formats engine results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    // ==================== Tools ====================

    pub fn format_tools<'a>(tools: impl IntoIterator<Item = &'a ToolDescriptor>) -> String {
        let mut output = Self::section_header("Registered tools");

        let mut count = 0;
        for tool in tools {
            count += 1;
            output.push_str(&format!(
                "  {:<20} {:<14} {}\n",
                tool.id.bold(),
                tool.category.to_string().cyan(),
                tool.display_name
            ));

            let mut traits = vec![format!("complexity: {}", tool.complexity)];
            if tool.cacheable {
                traits.push("cacheable".to_string());
            }
            if !tool.dependencies.is_empty() {
                let groups: Vec<&str> = tool.dependencies.iter().map(|g| g.as_str()).collect();
                traits.push(format!("depends on: {}", groups.join(", ")));
            }
            if let Some(fallback) = &tool.fallback {
                traits.push(format!("fallback: {}", fallback));
            }
            output.push_str(&format!("  {:<20} {}\n", "", traits.join(" | ").dimmed()));

            for param in &tool.params {
                let required = if param.required { "*" } else { " " };
                output.push_str(&format!(
                    "  {:<20}   {}{} ({}) {}\n",
                    "",
                    param.name,
                    required.red(),
                    param.param_type,
                    param.description.dimmed()
                ));
            }
        }

        if count == 0 {
            output.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        output
    }

    // ==================== Single execution ====================

    pub fn format_output(output: &ToolOutput) -> String {
        let mut text = format!(
            "{} {} {}\n",
            "✓".green().bold(),
            output.tool_id.bold(),
            Self::timing(output.duration_ms, output.attempts, output.cache_hit).dimmed()
        );
        text.push_str(&Self::indent(&Self::preview(&output.value), "  "));
        text.push('\n');
        text
    }

    pub fn format_error(error: &ToolError) -> String {
        let root = error.root();
        let mut text = format!(
            "{} {} [{}] {}\n",
            "✗".red().bold(),
            root.tool_id().bold(),
            root.kind().as_str().red(),
            root
        );

        if let ToolError::InvalidParameters { fields, .. } = root {
            for field in fields {
                text.push_str(&format!("  - {}: {:?}\n", field.field, field.reason));
            }
        }
        if let ToolError::CircuitOpen {
            retry_after: Some(after),
            ..
        } = root
        {
            text.push_str(&format!(
                "  {} {:.1}s\n",
                "retry after".dimmed(),
                after.as_secs_f64()
            ));
        }
        if let Some(fallback) = error.suggested_fallback() {
            text.push_str(&format!("  {} {}\n", "try instead:".yellow(), fallback.bold()));
        }
        text
    }

    // ==================== Chains ====================

    pub fn format_chain(outcome: &ChainOutcome) -> String {
        let mut output = Self::section_header("Chain");

        match outcome {
            Ok(synthesis) => {
                for step in &synthesis.steps {
                    output.push_str(&Self::format_step(step));
                }
                output.push('\n');
                let verdict = if synthesis.is_fully_successful() {
                    "completed".green().bold()
                } else {
                    "completed with recovered steps".yellow().bold()
                };
                output.push_str(&format!(
                    "{} {} steps ok, {} recovered, confidence {:.2}, {}ms\n",
                    verdict,
                    synthesis.completed,
                    synthesis.failed,
                    synthesis.aggregate_confidence,
                    synthesis.total_duration_ms
                ));
                if let Some(final_output) = synthesis.final_output() {
                    output.push_str(&format!("\n{}\n", "Final output:".cyan().bold()));
                    output.push_str(&Self::indent(&Self::preview(final_output), "  "));
                    output.push('\n');
                }
            }
            Err(failure) => {
                for step in &failure.steps {
                    output.push_str(&Self::format_step(step));
                }
                output.push('\n');
                output.push_str(&format!(
                    "{} at step {} ('{}') after {}ms\n",
                    "stopped".red().bold(),
                    failure.position + 1,
                    failure.failed_at,
                    failure.total_duration_ms
                ));
                if let Some(fallback) = failure.error.suggested_fallback() {
                    output.push_str(&format!(
                        "  {} {}\n",
                        "try instead:".yellow(),
                        fallback.bold()
                    ));
                }
            }
        }
        output
    }

    fn format_step(step: &StepRecord) -> String {
        let (mark, detail): (ColoredString, String) = match step.status {
            StepStatus::Completed => (
                "✓".green().bold(),
                Self::timing(step.duration_ms, 1, step.cache_hit),
            ),
            StepStatus::Recovered => (
                "~".yellow().bold(),
                format!(
                    "recovered: {}",
                    step.error_message.as_deref().unwrap_or("failed")
                ),
            ),
            StepStatus::Failed => (
                "✗".red().bold(),
                step.error_message.clone().unwrap_or_default(),
            ),
        };
        format!(
            "  {} {:>2}. {:<20} {}\n",
            mark,
            step.position + 1,
            step.tool_id.bold(),
            detail.dimmed()
        )
    }

    // ==================== Snapshot ====================

    /// `threshold` is the minimum score a group needs for its tools to run.
    pub fn format_snapshot(
        snapshot: &OperationalSnapshot,
        sweeps: &[GroupSweep],
        threshold: f64,
    ) -> String {
        let mut output = Self::header("Conductor status");
        output.push_str(&format!("\n{} {}\n", "Generated:".dimmed(), snapshot.generated_at));

        output.push_str(&Self::section_header("Dependency groups"));
        if snapshot.groups.is_empty() {
            output.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        for group in &snapshot.groups {
            let probed = sweeps.iter().any(|s| s.group == group.id);
            let score = format!("{:.2}", group.score);
            let score = if group.score >= threshold {
                score.green()
            } else {
                score.red()
            };
            output.push_str(&format!(
                "  {:<20} score {} probes {}{}\n",
                group.id.as_str().bold(),
                score,
                group.probe_count,
                (if probed { "" } else { " (no probe)" }).dimmed()
            ));
        }

        output.push_str(&Self::section_header("Circuit breakers"));
        if snapshot.breakers.is_empty() {
            output.push_str(&format!("  {}\n", "(no tool has run yet)".dimmed()));
        }
        for breaker in &snapshot.breakers {
            let mut line = format!(
                "  {:<20} {:<10} failures {}",
                breaker.tool_id.bold(),
                Self::state_label(breaker.state),
                breaker.consecutive_failures
            );
            if let Some(retry_after_ms) = breaker.retry_after_ms {
                line.push_str(&format!(", retry in {}ms", retry_after_ms));
            }
            if breaker.times_opened > 0 {
                line.push_str(&format!(", opened {}x", breaker.times_opened));
            }
            output.push_str(&line);
            output.push('\n');
        }

        output.push_str(&Self::section_header("Cache"));
        let cache = &snapshot.cache;
        output.push_str(&format!(
            "  {} entries, {} hits / {} misses (hit rate {:.0}%), {} evicted\n",
            cache.entries,
            cache.hits,
            cache.misses,
            cache.hit_rate * 100.0,
            cache.evictions
        ));

        output.push_str(&Self::section_header("Tool metrics"));
        if snapshot.metrics.is_empty() {
            output.push_str(&format!("  {}\n", "(no executions)".dimmed()));
        }
        for metrics in &snapshot.metrics {
            output.push_str(&format!(
                "  {:<20} {} runs, {:.0}% ok, {} cached, avg {:.1}ms\n",
                metrics.tool_id.bold(),
                metrics.executions,
                metrics.success_rate * 100.0,
                metrics.cache_hits,
                metrics.avg_latency_ms
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    fn state_label(state: CircuitState) -> ColoredString {
        match state {
            CircuitState::Closed => "closed".green(),
            CircuitState::Open => "open".red().bold(),
            CircuitState::HalfOpen => "half-open".yellow(),
        }
    }

    // ==================== JSON ====================

    /// Pretty JSON of any serializable result
    pub fn format_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn error_json(error: &ToolError) -> Value {
        let root = error.root();
        let mut value = json!({
            "status": "failed",
            "tool_id": root.tool_id(),
            "error_kind": root.kind(),
            "error": root.to_string(),
            "suggested_fallback": error.suggested_fallback(),
        });
        if let ToolError::CircuitOpen {
            retry_after: Some(after),
            ..
        } = root
        {
            value["retry_after_ms"] = json!(after.as_millis() as u64);
        }
        if let ToolError::InvalidParameters { fields, .. } = root {
            value["fields"] = json!(fields);
        }
        value
    }

    pub fn chain_json(outcome: &ChainOutcome) -> Value {
        match outcome {
            Ok(synthesis) => {
                let mut value = json!(synthesis);
                value["status"] = json!("completed");
                value
            }
            Err(failure) => json!({
                "status": "failed",
                "failed_at": failure.failed_at,
                "position": failure.position,
                "error_kind": failure.root_kind(),
                "error": failure.error.root().to_string(),
                "suggested_fallback": failure.error.suggested_fallback(),
                "total_duration_ms": failure.total_duration_ms,
                "steps": failure.steps,
            }),
        }
    }

    // ==================== Helpers ====================

    fn timing(duration_ms: u64, attempts: u32, cache_hit: bool) -> String {
        if cache_hit {
            return "(cached)".to_string();
        }
        if attempts > 1 {
            format!("({}ms, {} attempts)", duration_ms, attempts)
        } else {
            format!("({}ms)", duration_ms)
        }
    }

    fn preview(value: &Value) -> String {
        let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
        if pretty.len() > PREVIEW_BYTES {
            format!("{}...", truncate_str(&pretty, PREVIEW_BYTES))
        } else {
            pretty
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}\n", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_application::CacheStats;
    use conductor_domain::{
        BreakerSnapshot, ChainFailure, ChainSynthesis, DependencyGroup, ExecutionId,
        FieldViolation, ToolCategory,
    };
    use std::time::Duration;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_output_marks_cache_hits() {
        plain();
        let output = ToolOutput {
            execution_id: ExecutionId::new("e1"),
            tool_id: "comps".into(),
            value: json!({"count": 3}),
            cache_hit: true,
            attempts: 1,
            duration_ms: 0,
        };
        let text = ConsoleFormatter::format_output(&output);
        assert!(text.contains("comps"));
        assert!(text.contains("(cached)"));
        assert!(text.contains("\"count\": 3"));
    }

    #[test]
    fn test_format_error_shows_retry_and_fallback() {
        plain();
        let error = ToolError::CircuitOpen {
            tool_id: "listings".into(),
            retry_after: Some(Duration::from_secs(42)),
            suggested_fallback: Some("cached_listings".into()),
        };
        let text = ConsoleFormatter::format_error(&error);
        assert!(text.contains("[circuit_open]"));
        assert!(text.contains("retry after 42.0s"));
        assert!(text.contains("try instead: cached_listings"));

        let json = ConsoleFormatter::error_json(&error);
        assert_eq!(json["error_kind"], "circuit_open");
        assert_eq!(json["retry_after_ms"], 42000);
        assert_eq!(json["suggested_fallback"], "cached_listings");
    }

    #[test]
    fn test_format_error_lists_fields() {
        plain();
        let error = ToolError::invalid_parameters("comps", vec![FieldViolation::missing("zip")]);
        let text = ConsoleFormatter::format_error(&error);
        assert!(text.contains("- zip: Missing"));
        assert_eq!(ConsoleFormatter::error_json(&error)["fields"][0]["field"], "zip");
    }

    #[test]
    fn test_format_chain_failure_keeps_completed_steps() {
        plain();
        let done = StepRecord::completed(0, "comps", json!({"n": 1}), false, 12);
        let failure = ChainFailure::new(
            vec![done],
            1,
            "report",
            ToolError::permanent("report", "template missing"),
            18,
            30,
        );
        let outcome: ChainOutcome = Err(failure);

        let text = ConsoleFormatter::format_chain(&outcome);
        assert!(text.contains("comps"));
        assert!(text.contains("stopped at step 2 ('report')"));
        assert_eq!(text.matches("✗").count(), 1);
        assert!(text.contains("template missing"));

        let json = ConsoleFormatter::chain_json(&outcome);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["steps"][0]["tool_id"], "comps");
        assert_eq!(json["steps"][1]["status"], "failed");
        assert_eq!(json["error_kind"], "external");
    }

    #[test]
    fn test_format_chain_success() {
        plain();
        let steps = vec![
            StepRecord::completed(0, "comps", json!({"confidence": 0.5}), false, 5),
            StepRecord::failed(1, "enrich", &ToolError::transient("enrich", "503"), 7).recovered(),
            StepRecord::completed(2, "summary", json!({"text": "ok"}), true, 0),
        ];
        let outcome: ChainOutcome = Ok(ChainSynthesis::new(steps, 12));

        let text = ConsoleFormatter::format_chain(&outcome);
        assert!(text.contains("completed with recovered steps"));
        assert!(text.contains("recovered:"));
        assert!(text.contains("\"text\": \"ok\""));
        assert_eq!(ConsoleFormatter::chain_json(&outcome)["status"], "completed");
    }

    #[test]
    fn test_format_tools() {
        plain();
        let tool = ToolDescriptor::new("lookup", "Lookup", ToolCategory::Data)
            .depends_on("mls")
            .cacheable();
        let text = ConsoleFormatter::format_tools([&tool]);
        assert!(text.contains("lookup"));
        assert!(text.contains("depends on: mls"));
        assert!(text.contains("cacheable"));

        assert!(ConsoleFormatter::format_tools(std::iter::empty()).contains("(none)"));
    }

    #[test]
    fn test_format_snapshot() {
        plain();
        let mut group = DependencyGroup::new("mls");
        group.score = 0.21;
        group.probe_count = 4;
        let snapshot = OperationalSnapshot {
            generated_at: "2026-01-01T00:00:00+00:00".into(),
            breakers: vec![BreakerSnapshot {
                tool_id: "listings".into(),
                state: CircuitState::Open,
                consecutive_failures: 5,
                times_opened: 1,
                trial_in_flight: false,
                open_for_ms: Some(1000),
                retry_after_ms: Some(59000),
            }],
            cache: CacheStats {
                entries: 2,
                hits: 3,
                misses: 1,
                inserts: 2,
                evictions: 0,
                hit_rate: 0.75,
            },
            metrics: Vec::new(),
            groups: vec![group],
        };

        let text = ConsoleFormatter::format_snapshot(&snapshot, &[], 0.5);
        assert!(text.contains("score 0.21 probes 4 (no probe)"));
        assert!(text.contains("retry in 59000ms"));
        assert!(text.contains("hit rate 75%"));
        assert!(text.contains("(no executions)"));
    }

    #[test]
    fn test_preview_truncates_long_output() {
        let long = json!({"text": "x".repeat(2000)});
        let preview = ConsoleFormatter::preview(&long);
        assert!(preview.len() <= PREVIEW_BYTES + 3);
        assert!(preview.ends_with("..."));
    }
}
