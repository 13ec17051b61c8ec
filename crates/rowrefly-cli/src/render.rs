//! Console and Markdown rendering of a suite report

use colored::Colorize;
use rowrefly_core::{CaseStatus, CheckStatus, ColumnResult, SuiteReport, ValidationReport};

/// Generate markdown report
pub fn generate_markdown_report(report: &SuiteReport) -> String {
    let mut md = String::new();

    md.push_str("# RowRefly Validation Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));

    let summary = &report.summary;
    md.push_str("## Summary\n\n");
    md.push_str(&format!(
        "- Cases: {} ({} passed, {} failed, {} skipped)\n",
        summary.cases, summary.cases_passed, summary.cases_failed, summary.cases_skipped
    ));
    md.push_str(&format!(
        "- Tables: {} ({} passed, {} failed, {} skipped)\n",
        summary.tables_checked, summary.tables_passed, summary.tables_failed, summary.tables_skipped
    ));
    md.push('\n');

    if !report.has_failures() {
        md.push_str("✅ **All tables match!**\n\n");
    }

    for case in &report.cases {
        let emoji = match case.status {
            CaseStatus::Pass => "✅",
            CaseStatus::Fail => "❌",
            CaseStatus::Skipped => "⏭️",
        };
        md.push_str(&format!("## {} {}", emoji, case.test_case_id));
        if !case.scenario_name.is_empty() {
            md.push_str(&format!(" - {}", case.scenario_name));
        }
        md.push_str(&format!(" ({})\n\n", case.status));

        for table in &case.tables {
            push_table(&mut md, table);
        }
    }

    md
}

fn push_table(md: &mut String, table: &ValidationReport) {
    md.push_str(&format!("### {} - {}\n\n", table.table_name, table.status));

    for error in &table.global_errors {
        md.push_str(&format!("- **{}:** {}\n", error.kind, error.message));
    }
    if !table.global_errors.is_empty() {
        md.push('\n');
    }

    let entries: Vec<&ColumnResult> = table.results.iter().filter(|r| r.status != CheckStatus::Pass).collect();
    if entries.is_empty() {
        md.push_str(&format!("{} checks passed\n\n", table.count(CheckStatus::Pass)));
        return;
    }

    md.push_str("| Column | Check | Status | Expected | Actual | Reason |\n");
    md.push_str("|---|---|---|---|---|---|\n");
    for r in entries {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            cell(Some(&r.column)),
            r.code,
            r.status,
            cell(r.expected.as_ref()),
            cell(r.actual.as_ref()),
            cell(r.reason.as_ref()),
        ));
    }
    md.push('\n');
}

/// Table cell: code-formatted, pipes escaped
fn cell(text: Option<&String>) -> String {
    match text {
        Some(text) if !text.is_empty() => format!("`{}`", text.replace('|', "\\|").replace('\n', " ")),
        _ => String::new(),
    }
}

/// Print report summary to console
pub fn print_report_summary(report: &SuiteReport, verbose: bool) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "RowRefly Validation Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    for case in &report.cases {
        let status = match case.status {
            CaseStatus::Pass => "✓ PASS".green(),
            CaseStatus::Fail => "✗ FAIL".red(),
            CaseStatus::Skipped => "- SKIPPED".yellow(),
        };
        let label = if case.scenario_name.is_empty() {
            case.test_case_id.clone()
        } else {
            format!("{} ({})", case.test_case_id, case.scenario_name)
        };
        println!("{} {}", status, label.bold());

        for table in &case.tables {
            print_table(table, verbose);
        }
        println!();
    }

    let summary = &report.summary;
    println!("{}", "=".repeat(60).bright_blue());
    println!(
        "{} {} passed, {} failed, {} skipped",
        "Cases:".bold(),
        summary.cases_passed.to_string().green(),
        summary.cases_failed.to_string().red(),
        summary.cases_skipped.to_string().yellow()
    );
    println!(
        "{} {} passed, {} failed, {} skipped",
        "Tables:".bold(),
        summary.tables_passed.to_string().green(),
        summary.tables_failed.to_string().red(),
        summary.tables_skipped.to_string().yellow()
    );

    if !summary.failures.is_empty() {
        println!("{} {}", "Failures:".bold().red(), summary.failures.join(", "));
    }
}

fn print_table(table: &ValidationReport, verbose: bool) {
    let status = if !table.is_pass() {
        "✗".red()
    } else if table.presence_only {
        "-".yellow()
    } else {
        "✓".green()
    };
    println!("  {} {}", status, table.table_name);

    for error in &table.global_errors {
        println!("      {} {}", error.kind.to_string().red(), error.message);
    }

    for r in &table.results {
        let marker = match r.status {
            CheckStatus::Fail => "FAIL".red(),
            CheckStatus::Skipped if verbose => "SKIPPED".yellow(),
            _ => continue,
        };
        println!(
            "      {} {} [{}] {}",
            marker,
            r.column,
            r.code,
            r.reason.as_deref().unwrap_or_default()
        );
        if r.expected.is_some() || r.actual.is_some() {
            println!(
                "          expected: {}  actual: {}",
                r.expected.as_deref().unwrap_or("-"),
                r.actual.as_deref().unwrap_or("-")
            );
        }
    }
}
