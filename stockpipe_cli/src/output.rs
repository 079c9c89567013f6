use clap::ValueEnum;
use stockpipe_lib::{RowFailure, RunOutcome, RunSummary};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Received")]
    received: usize,
    #[tabled(rename = "Inserted")]
    inserted: usize,
    #[tabled(rename = "Already Present")]
    skipped_existing: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

// -- Row builders --

fn build_summary_row(summary: &RunSummary) -> SummaryRow {
    SummaryRow {
        symbol: summary.symbol.clone(),
        received: summary.received,
        inserted: summary.inserted,
        skipped_existing: summary.skipped_existing,
        failed: summary.failed.len(),
    }
}

fn build_failure_rows(failed: &[RowFailure]) -> Vec<FailureRow> {
    failed
        .iter()
        .map(|f| FailureRow {
            date: f.date.clone(),
            reason: f.reason.clone(),
        })
        .collect()
}

fn render_summary(summary: &RunSummary) -> String {
    let mut out = Table::new([build_summary_row(summary)])
        .with(Style::sharp())
        .to_string();
    if !summary.failed.is_empty() {
        out.push('\n');
        out.push_str(
            &Table::new(build_failure_rows(&summary.failed))
                .with(Style::sharp())
                .to_string(),
        );
    }
    out
}

/// Print the outcome of a run. Aborts print nothing in table mode; they are
/// already logged and reported through the exit status.
pub fn print_outcome(outcome: &RunOutcome, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Table => {
            if let Some(summary) = outcome.summary() {
                println!("{}", render_summary(summary));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpipe_lib::AbortReason;

    fn summary_with_failure() -> RunSummary {
        RunSummary {
            symbol: "IBM".to_string(),
            received: 3,
            inserted: 1,
            skipped_existing: 1,
            failed: vec![RowFailure {
                date: "2024-01-03".to_string(),
                reason: "field 'open' has non-numeric value 'abc'".to_string(),
            }],
        }
    }

    #[test]
    fn test_build_summary_row_counts_failures() {
        let row = build_summary_row(&summary_with_failure());
        assert_eq!(row.symbol, "IBM");
        assert_eq!(row.received, 3);
        assert_eq!(row.inserted, 1);
        assert_eq!(row.skipped_existing, 1);
        assert_eq!(row.failed, 1);
    }

    #[test]
    fn test_render_summary_headers() {
        let out = render_summary(&summary_with_failure());
        for header in ["Symbol", "Received", "Inserted", "Already Present", "Failed"] {
            assert!(out.contains(header), "missing header {}", header);
        }
        assert!(out.contains("2024-01-03"));
        assert!(out.contains("non-numeric"));
    }

    #[test]
    fn test_render_summary_omits_failure_table_when_clean() {
        let summary = RunSummary {
            symbol: "IBM".to_string(),
            received: 2,
            inserted: 2,
            ..Default::default()
        };
        let out = render_summary(&summary);
        assert!(!out.contains("Reason"));
    }

    #[test]
    fn test_json_outcome_serializable() {
        let outcome = RunOutcome::Aborted(AbortReason::Fetch {
            attempts: 3,
            error: "HTTP 503".to_string(),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["Aborted"]["Fetch"]["attempts"], 3);

        let outcome = RunOutcome::Completed(summary_with_failure());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["Completed"]["failed"][0]["date"], "2024-01-03");
    }
}
