use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::bail;
use clap::Parser;
use listmover_core::Identifier;
use listmover_core::audit::AuditComparison;
use listmover_core::audit::AuditRecord;
use listmover_core::audit::RunKey;
use listmover_core::config::ConfigOverrides;
use listmover_core::ledger::LedgerViolation;
use listmover_core::persistence::JsonFileSink;
use tracing::warn;

#[derive(Debug, Parser)]
pub struct ReportArgs {
    /// Directory holding the audit files (defaults to the configured log_dir).
    #[arg(long = "log-dir")]
    pub log_dir: Option<PathBuf>,

    /// Run key (yyyyMMdd-HHmmss). Defaults to the latest run.
    #[arg(long = "run")]
    pub run: Option<String>,

    /// Output as JSON.
    #[arg(long = "json", short = 'j')]
    pub json: bool,
}

pub fn run(args: &ReportArgs) -> anyhow::Result<i32> {
    let log_dir = match &args.log_dir {
        Some(dir) => dir.clone(),
        None => {
            crate::load_config(None, ConfigOverrides::default())
                .context("failed to load configuration")?
                .log_dir
        }
    };
    if !log_dir.is_dir() {
        bail!("log directory {} does not exist", log_dir.display());
    }
    let sink = JsonFileSink::new(&log_dir)?;

    let run_key = match &args.run {
        Some(raw) => match RunKey::parse(raw) {
            Some(key) => key,
            None => bail!("invalid run key '{raw}' (expected yyyyMMdd-HHmmss)"),
        },
        None => match sink.latest_run_key()? {
            Some(key) => key,
            None => bail!("no runs found in {}", log_dir.display()),
        },
    };

    let record = sink
        .read_record(&run_key)
        .with_context(|| format!("failed to read run {run_key}"))?;
    let comparison = AuditComparison::compare(&record.snapshot, &record.ledger);
    let violations = record.ledger.check_invariants();
    for violation in &violations {
        warn!("Ledger invariant violated: {violation}");
    }

    if args.json {
        let report = serde_json::json!({
            "runKey": record.run_key,
            "snapshotSize": record.snapshot.len(),
            "ledger": record.ledger,
            "comparison": comparison,
            "violations": violations.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&record, &comparison, &violations));
    }
    Ok(0)
}

fn render_text(
    record: &AuditRecord,
    comparison: &AuditComparison,
    violations: &[LedgerViolation],
) -> String {
    let ledger = &record.ledger;
    let mut out = String::new();
    let _ = writeln!(out, "Run {}", record.run_key);
    let _ = writeln!(out, "  snapshot:  {} identifier(s)", record.snapshot.len());
    let _ = writeln!(out, "  cart:      {}", ledger.cart_asins().len());
    let _ = writeln!(out, "  saved:     {}", ledger.saved_asins().len());
    let _ = writeln!(out, "  added:     {}", ledger.added_asins().len());
    let _ = writeln!(out, "  deleted:   {}", ledger.deleted_asins().len());
    let _ = writeln!(out, "  failed:    {}", ledger.failed_retries().len());

    section(&mut out, "Promoted but not deleted", &comparison.promoted_not_deleted);
    section(&mut out, "Not promoted", &comparison.not_promoted);
    section(&mut out, "Untouched", &comparison.untouched);
    section(&mut out, "Appeared during run", &comparison.appeared_during_run);

    if !ledger.failed_retries().is_empty() {
        let _ = writeln!(out, "Failures:");
        for failure in ledger.failed_retries() {
            let _ = writeln!(out, "  {}: {}", failure.asin, failure.reason);
        }
    }
    if !violations.is_empty() {
        let _ = writeln!(out, "Invariant violations:");
        for violation in violations {
            let _ = writeln!(out, "  {violation}");
        }
    }
    out
}

fn section(out: &mut String, title: &str, ids: &[Identifier]) {
    if ids.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title} ({}):", ids.len());
    for id in ids {
        let _ = writeln!(out, "  {id}");
    }
}
