//! Result rendering for humans (text) and agents (JSON).

use clap::ValueEnum;
use colored::Colorize;
use scout::search::{PhaseStatus, SearchPhase, SearchReport};

use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	Text,
	Json,
}

pub fn print_error_stderr(err: &CliError) {
	eprintln!("{} {}", "error:".red().bold(), err);
}

/// One-line phase progress, streamed to stderr as the engine reports it.
pub fn print_phase_stderr(phase: &SearchPhase) {
	let marker = match phase.status {
		PhaseStatus::Running => "..".dimmed(),
		PhaseStatus::Completed => "ok".green(),
		PhaseStatus::Failed => "failed".red(),
	};
	eprintln!("[{}] {} {}", marker, phase.phase.bold(), phase.message.dimmed());
}

pub fn print_report(report: &SearchReport, format: OutputFormat) -> serde_json::Result<()> {
	match format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(report)?);
		}
		OutputFormat::Text => print_report_text(report),
	}
	Ok(())
}

fn print_report_text(report: &SearchReport) {
	if report.curated.is_empty() {
		println!("{}", "no results captured".yellow());
	}
	for url in &report.curated {
		println!(
			"{:5.2}  {}  {}  {}",
			url.relevance_score,
			url.kind.as_str().cyan(),
			url.url.bold(),
			url.title.dimmed()
		);
	}

	let counts = report
		.summary
		.iter()
		.map(|(route, count)| format!("{route} {count}"))
		.collect::<Vec<_>>()
		.join(", ");
	println!();
	println!(
		"{} {} result(s) in {}ms{}",
		if report.success {
			"done:".green().bold()
		} else {
			"incomplete:".red().bold()
		},
		report.curated.len(),
		report.total_duration_ms,
		if counts.is_empty() {
			String::new()
		} else {
			format!(" ({counts})")
		}
	);

	let failures: Vec<&scout::route::RouteExecutionResult> = report
		.route_results
		.iter()
		.filter(|result| !result.success)
		.collect();
	if !failures.is_empty() {
		println!();
		for failure in failures {
			println!(
				"{} {}/{}: {}",
				"failed".red(),
				failure.route,
				failure.keyword,
				failure.errors.join("; ")
			);
		}
	}
}
