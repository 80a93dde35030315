use anyhow::Result;
use ironval::testing::*;
use ironval::*;

fn pair_validation(b: impl DatasetReader + 'static, gpis: &[u64]) -> Result<Validation> {
    let mut a = InMemoryReader::new();
    for &gpi in gpis {
        a.insert(gpi, daily_frame("sm", &soil_moisture_signal(30, gpi)));
    }
    Ok(Validation::builder()
        .dataset(DatasetSpec::new("A", a, ["sm"]))
        .dataset(DatasetSpec::new("B", b, ["sm"]))
        .metric(2, 2, BasicMetrics)
        .build()?)
}

fn b_reader(gpis: &[u64]) -> InMemoryReader {
    let mut b = InMemoryReader::new();
    for &gpi in gpis {
        b.insert(gpi, daily_frame("sm", &linear(&soil_moisture_signal(30, gpi), 1.5, 0.02)));
    }
    b
}

fn jobs(gpis: &[u64]) -> Vec<Job> {
    gpis.iter().map(|&g| Job::new(g, g as f64, -(g as f64))).collect()
}

#[test]
fn transient_failure_is_retried_once() -> Result<()> {
    let gpis = [1];
    let validation = pair_validation(FlakyReader::new(b_reader(&gpis), "B", 1), &gpis)?;
    let outcomes = JobRunner::sequential().run(&validation, &jobs(&gpis))?;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].attempts, 2);
    assert_eq!(outcomes[0].result.as_ref().map(|r| r.len()).ok(), Some(1));
    Ok(())
}

#[test]
fn second_transient_failure_is_reported() -> Result<()> {
    let gpis = [1];
    let validation = pair_validation(FlakyReader::new(b_reader(&gpis), "B", 2), &gpis)?;
    let outcomes = JobRunner::sequential().run(&validation, &jobs(&gpis))?;
    assert!(matches!(outcomes[0].result, Err(Error::TransientRead { .. })));
    let summary = RunSummary::from_outcomes(&outcomes);
    assert_eq!((summary.failed, summary.retried), (1, 1));
    Ok(())
}

#[test]
fn no_retry_when_disabled() -> Result<()> {
    let gpis = [1];
    let validation = pair_validation(FlakyReader::new(b_reader(&gpis), "B", 1), &gpis)?;
    let runner = JobRunner {
        mode: ExecMode::Sequential,
        retry: RetryPolicy::Never,
    };
    let outcomes = runner.run(&validation, &jobs(&gpis))?;
    assert_eq!(outcomes[0].attempts, 1);
    assert!(outcomes[0].result.is_err());
    Ok(())
}

#[test]
fn parallel_matches_sequential() -> Result<()> {
    let gpis: Vec<u64> = (1..=16).collect();
    let validation = pair_validation(b_reader(&gpis), &gpis)?;
    let jobs = jobs(&gpis);

    let seq = JobRunner::sequential().run(&validation, &jobs)?;
    let par = JobRunner {
        mode: ExecMode::Parallel { threads: Some(4) },
        retry: RetryPolicy::Once,
    }
    .run(&validation, &jobs)?;

    assert_eq!(seq.len(), par.len());
    for (s, p) in seq.iter().zip(&par) {
        assert_eq!(s.job, p.job);
        let (Ok(s), Ok(p)) = (&s.result, &p.result) else {
            panic!("job {} failed", s.job);
        };
        assert_eq!(serde_json::to_string(s.values().collect::<Vec<_>>().as_slice())?,
                   serde_json::to_string(p.values().collect::<Vec<_>>().as_slice())?);
    }
    Ok(())
}

#[test]
fn run_into_collects_successful_jobs() -> Result<()> {
    let gpis = [1, 2, 3];
    // gpi 3 has no reference data and fails.
    let validation = pair_validation(b_reader(&gpis), &gpis[..2])?;
    let mut sink: Vec<JobResults> = Vec::new();
    let summary = JobRunner::default().run_into(&validation, &jobs(&gpis), &mut sink)?;

    assert_eq!(
        summary,
        RunSummary { jobs: 3, succeeded: 2, failed: 1, retried: 0, records: 2 }
    );
    assert_eq!(sink.len(), 2);
    Ok(())
}
