use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use pdufa_engine::analysis::{
    run_backtest, AnalysisContext, AnalysisResult, BacktestCase, BacktestReport, BatchItem,
    BatchRunner, ContextBuilder, FactorInfo, Layer, ProbabilityCalculator,
};
use pdufa_engine::config::AppConfig;
use pdufa_engine::error::AppError;
use pdufa_engine::facts::{FactRecord, FactStore, FactValue, ProvenanceTag};
use pdufa_engine::telemetry;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::{AnalyzeArgs, BacktestArgs, BatchArgs, FactorsArgs, GlobalArgs};
use crate::infra::JsonDirFactStore;

/// Everything a command needs, assembled once from config and flags.
pub(crate) struct Engine {
    config: AppConfig,
    calculator: Arc<ProbabilityCalculator>,
    builder: ContextBuilder,
    store: JsonDirFactStore,
    as_of: NaiveDate,
}

impl Engine {
    pub(crate) fn start(globals: GlobalArgs) -> Result<Self, AppError> {
        let mut config = AppConfig::load()?;
        if let Some(path) = globals.constants {
            config.analysis.constants_path = Some(path);
        }
        if let Some(policy) = globals.trust_policy {
            config.analysis.trust_policy = policy;
        }

        telemetry::init(&config.telemetry)?;

        let constants = config.analysis.calculator_config()?;
        let calculator = Arc::new(ProbabilityCalculator::with_defaults(constants)?);
        let as_of = globals.as_of.unwrap_or_else(|| Local::now().date_naive());

        info!(
            ?config.environment,
            policy = ?config.analysis.trust_policy,
            factors = calculator.registry().len(),
            %as_of,
            "pdufa engine ready"
        );

        Ok(Self {
            builder: ContextBuilder::new(config.analysis.trust_policy),
            store: JsonDirFactStore::new(globals.facts_dir),
            config,
            calculator,
            as_of,
        })
    }

    fn record(&self, event_id: &str) -> Result<FactRecord, AppError> {
        Ok(self.store.load(event_id)?)
    }

    fn context(&self, record: &FactRecord) -> Result<AnalysisContext, AppError> {
        Ok(self.builder.build(record, self.as_of)?)
    }
}

pub(crate) fn analyze(engine: &Engine, args: AnalyzeArgs) -> Result<(), AppError> {
    let AnalyzeArgs {
        event_id,
        json,
        what_if,
    } = args;

    let record = engine.record(&event_id)?;
    let context = engine.context(&record)?;

    if what_if.is_empty() {
        let result = engine.calculator.calculate(&context)?;
        if json {
            println!("{}", result.to_json()?);
        } else {
            print!("{}", result.explain());
        }
        return Ok(());
    }

    let mut scenarios = BTreeMap::new();
    for (fact, value) in what_if {
        let name = format!("{fact}={}", describe_value(&value));
        let mut variant = record.clone();
        variant.set(fact, value, ProvenanceTag::VerifiedPrimary);
        scenarios.insert(name, engine.context(&variant)?);
    }

    let results = engine.calculator.calculate_scenarios(&context, &scenarios)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        render_scenarios(&results);
    }
    Ok(())
}

fn describe_value(value: &FactValue) -> String {
    match value {
        FactValue::Bool(flag) => flag.to_string(),
        FactValue::Integer(number) => number.to_string(),
        FactValue::Number(number) => number.to_string(),
        FactValue::Text(text) => text.clone(),
    }
}

fn render_scenarios(results: &BTreeMap<String, AnalysisResult>) {
    let Some(base) = results.get("base") else {
        return;
    };
    println!("{}", base.summary());
    for (name, result) in results.iter().filter(|(name, _)| name.as_str() != "base") {
        println!(
            "  {name}: {:.1}% ({:+.1} points)",
            result.probability * 100.0,
            (result.probability - base.probability) * 100.0
        );
    }
}

#[derive(Debug, Serialize)]
struct BatchRow {
    event_id: String,
    ticker: String,
    drug_name: String,
    pdufa_date: String,
    probability: Option<f64>,
    confidence: Option<f64>,
    factors_applied: usize,
    warnings: usize,
    error: Option<String>,
}

impl BatchRow {
    fn failed(event_id: String, error: String) -> Self {
        Self {
            event_id,
            ticker: String::new(),
            drug_name: String::new(),
            pdufa_date: String::new(),
            probability: None,
            confidence: None,
            factors_applied: 0,
            warnings: 0,
            error: Some(error),
        }
    }

    fn from_item(item: BatchItem) -> Self {
        match item.outcome {
            Ok(result) => Self {
                event_id: item.id,
                pdufa_date: result
                    .pdufa_date
                    .map(|date| date.to_string())
                    .unwrap_or_default(),
                probability: Some(result.probability),
                confidence: Some(result.confidence.score),
                factors_applied: result.applied_factors().count(),
                warnings: result.warnings.len(),
                ticker: result.ticker,
                drug_name: result.drug_name,
                error: None,
            },
            Err(err) => Self::failed(item.id, err.to_string()),
        }
    }
}

pub(crate) async fn batch(engine: &Engine, args: BatchArgs) -> Result<(), AppError> {
    let BatchArgs {
        event_ids,
        output,
        concurrency,
    } = args;

    let event_ids = if event_ids.is_empty() {
        engine.store.event_ids()?
    } else {
        event_ids
    };

    let mut rows = Vec::new();
    let mut contexts = Vec::with_capacity(event_ids.len());
    for event_id in event_ids {
        match engine.record(&event_id).and_then(|record| engine.context(&record)) {
            Ok(context) => contexts.push((event_id, context)),
            Err(err) => {
                warn!(event = %event_id, error = %err, "event skipped");
                rows.push(BatchRow::failed(event_id, err.to_string()));
            }
        }
    }

    let concurrency = concurrency.unwrap_or(engine.config.analysis.batch_concurrency);
    let runner = BatchRunner::new(Arc::clone(&engine.calculator), concurrency);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });
    let report = runner.run_until_cancelled(contexts, cancel_rx).await?;
    interrupt.abort();

    if report.cancelled > 0 {
        warn!(cancelled = report.cancelled, "batch interrupted; partial results written");
    }
    rows.extend(report.items.into_iter().map(BatchRow::from_item));

    let sink: Box<dyn Write> = match &output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    write_rows(sink, &rows)?;
    info!(rows = rows.len(), "batch summary written");
    Ok(())
}

fn write_rows(sink: impl Write, rows: &[BatchRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(sink);
    for row in rows {
        writer.serialize(row).map_err(io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn backtest(engine: &Engine, args: BacktestArgs) -> Result<(), AppError> {
    let mut cases = Vec::new();
    for event_id in engine.store.event_ids()? {
        let record = engine.record(&event_id)?;
        let Some(outcome) = record.outcome else {
            continue;
        };
        cases.push(BacktestCase {
            context: engine.context(&record)?,
            id: event_id,
            outcome,
        });
    }

    let report = run_backtest(&engine.calculator, &cases, args.threshold);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_backtest(&report);
    }
    Ok(())
}

fn render_backtest(report: &BacktestReport) {
    let metrics = &report.metrics;
    println!(
        "Backtest: {} events ({} approved, {} CRL), {} skipped",
        metrics.total,
        metrics.approved,
        metrics.rejected,
        report.skipped.len()
    );
    println!(
        "- accuracy {:.3} | precision {:.3} | recall {:.3} | F1 {:.3} at threshold {:.2}",
        metrics.accuracy, metrics.precision, metrics.recall, metrics.f1, metrics.threshold
    );
    println!("- Brier score {:.4}", metrics.brier_score);
    match metrics.roc_auc {
        Some(auc) => println!("- ROC AUC {auc:.3}"),
        None => println!("- ROC AUC n/a (single outcome class)"),
    }
    if let Some(separation) = metrics.separation {
        println!("- mean probability separation {:+.1} points", separation * 100.0);
    }
    println!("Calibration:");
    for bucket in &report.calibration {
        println!(
            "  {:>3.0}-{:<3.0}% n={:<4} predicted {:.1}% actual {:.1}%",
            bucket.lower * 100.0,
            bucket.upper * 100.0,
            bucket.count,
            bucket.mean_probability * 100.0,
            bucket.approval_rate * 100.0
        );
    }
    for (id, reason) in &report.skipped {
        println!("  skipped {id}: {reason}");
    }
}

pub(crate) fn factors(engine: &Engine, args: FactorsArgs) -> Result<(), AppError> {
    let layer = args.layer.as_deref().map(parse_layer).transpose()?;
    let listing: Vec<FactorInfo> = engine
        .calculator
        .registry()
        .list()
        .into_iter()
        .filter(|info| layer.map_or(true, |layer| info.layer == layer))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for info in &listing {
        let group = info
            .group
            .as_ref()
            .map(|group| format!(" [{} {:?}]", group.key, group.policy))
            .unwrap_or_default();
        let mut flags = Vec::new();
        if !info.enabled {
            flags.push("disabled".to_string());
        }
        if let Some(reason) = &info.deprecated {
            flags.push(format!("deprecated: {reason}"));
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!(
            "{:<16} {:>3} {} v{}{group}{flags}",
            info.layer.key(),
            info.order,
            info.name,
            info.version
        );
        if !info.description.is_empty() {
            println!("{:<20} {}", "", info.description);
        }
    }
    Ok(())
}

fn parse_layer(raw: &str) -> Result<Layer, AppError> {
    let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    Ok(serde_json::from_value(serde_json::Value::String(key))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdufa_engine::analysis::InvalidContext;

    #[test]
    fn layer_names_parse_loosely() {
        assert_eq!(parse_layer("Earnings-Call").ok(), Some(Layer::EarningsCall));
        assert_eq!(parse_layer("adcom").ok(), Some(Layer::AdCom));
        assert!(parse_layer("astrology").is_err());
    }

    #[test]
    fn csv_rows_include_failures() {
        let rows = vec![
            BatchRow {
                event_id: "abcd-2026".to_string(),
                ticker: "ABCD".to_string(),
                drug_name: "abcimab".to_string(),
                pdufa_date: "2026-04-30".to_string(),
                probability: Some(0.85),
                confidence: Some(0.7),
                factors_applied: 4,
                warnings: 1,
                error: None,
            },
            BatchRow::from_item(BatchItem {
                id: "efgh-2025".to_string(),
                outcome: Err(InvalidContext::MissingTicker),
            }),
        ];

        let mut buffer = Vec::new();
        write_rows(&mut buffer, &rows).expect("csv written");
        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "event_id,ticker,drug_name,pdufa_date,probability,confidence,factors_applied,warnings,error"
        );
        assert_eq!(lines[1], "abcd-2026,ABCD,abcimab,2026-04-30,0.85,0.7,4,1,");
        assert!(lines[2].starts_with("efgh-2025,,,,,,0,0,"));
        assert!(lines[2].contains("missing a ticker"));
    }
}
