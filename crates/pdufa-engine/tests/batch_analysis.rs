use std::sync::{mpsc, Arc, Mutex};

use chrono::NaiveDate;
use pdufa_engine::analysis::{
    AnalysisContext, BatchRunner, Factor, FactorRegistry, FactorRule, InvalidContext, Layer,
    Observed, ProbabilityCalculator, RuleInput, RuleOutcome, TrialPhase,
};
use pdufa_engine::CalculatorConfig;
use tokio::sync::watch;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn runner(concurrency: usize) -> BatchRunner {
    let registry = FactorRegistry::with_defaults(CalculatorConfig::default())
        .expect("stock factors register");
    BatchRunner::new(
        Arc::new(ProbabilityCalculator::new(Arc::new(registry))),
        concurrency,
    )
}

fn contexts(count: usize) -> Vec<(String, AnalysisContext)> {
    (0..count)
        .map(|index| {
            let ticker = format!("T{index:03}");
            let mut context =
                AnalysisContext::new(ticker.clone(), "testumab", date(2026, 5, 1), date(2026, 1, 5));
            context.clinical.trial_phase = Observed::Known(if index % 2 == 0 {
                TrialPhase::Phase3
            } else {
                TrialPhase::Phase2
            });
            (ticker, context)
        })
        .collect()
}

#[tokio::test]
async fn results_come_back_in_submission_order() {
    let input = contexts(24);
    let expected: Vec<String> = input.iter().map(|(id, _)| id.clone()).collect();

    let report = runner(3).run(input).await.expect("batch runs");

    assert_eq!(report.cancelled, 0);
    let ids: Vec<String> = report.items.iter().map(|item| item.id.clone()).collect();
    assert_eq!(ids, expected);
    for (index, item) in report.items.iter().enumerate() {
        let result = item.outcome.as_ref().expect("context is valid");
        let expected = if index % 2 == 0 { 0.65 } else { 0.50 };
        assert!((result.base_probability - expected).abs() < 1e-9);
    }
}

#[tokio::test]
async fn invalid_context_fails_only_its_own_item() {
    let mut input = contexts(5);
    input[2].1.drug_name = String::new();

    let report = runner(2).run(input).await.expect("batch runs");

    assert_eq!(report.items.len(), 5);
    assert_eq!(
        report.items[2].outcome.as_ref().err(),
        Some(&InvalidContext::MissingDrugName)
    );
    assert!(report
        .items
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != 2)
        .all(|(_, item)| item.outcome.is_ok()));
}

#[tokio::test]
async fn batch_matches_sequential_calculation() {
    let runner = runner(4);
    let calculator = ProbabilityCalculator::with_defaults(CalculatorConfig::default())
        .expect("stock factors register");
    let input = contexts(8);
    let sequential: Vec<f64> = input
        .iter()
        .map(|(_, context)| {
            calculator
                .calculate(context)
                .expect("context is valid")
                .probability
        })
        .collect();

    let report = runner.run(input).await.expect("batch runs");

    let batched: Vec<f64> = report
        .items
        .iter()
        .map(|item| item.outcome.as_ref().expect("context is valid").probability)
        .collect();
    assert_eq!(batched, sequential);
}

#[tokio::test]
async fn cancelled_batch_does_no_work() {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    cancel_tx.send(true).expect("receiver alive");

    let report = runner(2)
        .run_until_cancelled(contexts(6), cancel_rx)
        .await
        .expect("batch runs");

    assert!(report.items.is_empty());
    assert_eq!(report.cancelled, 6);
}

/// Announces each evaluation, then holds it until released. Dropping the
/// release sender lets every held evaluation finish.
struct HeldRule {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl FactorRule for HeldRule {
    fn evaluate(&self, _: &AnalysisContext, _: &RuleInput<'_>) -> RuleOutcome {
        if let Ok(started) = self.started.lock() {
            let _ = started.send(());
        }
        if let Ok(release) = self.release.lock() {
            let _ = release.recv();
        }
        Ok(None)
    }
}

async fn next_start(started: &Arc<Mutex<mpsc::Receiver<()>>>) {
    let started = Arc::clone(started);
    tokio::task::spawn_blocking(move || {
        started
            .lock()
            .expect("start lock")
            .recv()
            .expect("evaluation started")
    })
    .await
    .expect("wait for start");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_mid_run_keeps_finished_work() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let registry = FactorRegistry::with_defaults(CalculatorConfig::default())
        .expect("stock factors register");
    registry
        .register(Factor::new(
            "held_signal",
            Layer::Special,
            99,
            Arc::new(HeldRule {
                started: Mutex::new(started_tx),
                release: Mutex::new(release_rx),
            }),
        ))
        .expect("new name");
    let runner = BatchRunner::new(
        Arc::new(ProbabilityCalculator::new(Arc::new(registry))),
        1,
    );

    let input = contexts(6);
    let total = input.len();
    let order: Vec<String> = input.iter().map(|(id, _)| id.clone()).collect();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let run = tokio::spawn(async move { runner.run_until_cancelled(input, cancel_rx).await });

    let started = Arc::new(Mutex::new(started_rx));
    next_start(&started).await;
    release_tx.send(()).expect("first evaluation waiting");
    // With one permit, a second start means the first analysis has finished.
    next_start(&started).await;
    cancel_tx.send(true).expect("runner listening");

    let report = run.await.expect("runner task").expect("batch runs");
    drop(release_tx);

    assert!(!report.items.is_empty());
    assert!(report.cancelled > 0);
    assert_eq!(report.items.len() + report.cancelled, total);
    let positions: Vec<usize> = report
        .items
        .iter()
        .map(|item| {
            order
                .iter()
                .position(|id| *id == item.id)
                .expect("submitted id")
        })
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(report.items.iter().all(|item| item.outcome.is_ok()));
}

#[tokio::test]
async fn empty_batch_completes() {
    let report = runner(1).run(Vec::new()).await.expect("batch runs");
    assert!(report.items.is_empty());
    assert_eq!(report.cancelled, 0);
}
