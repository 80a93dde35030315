#![cfg(feature = "io-jsonl")]

use anyhow::Result;
use ironval::io::jsonl::read_results;
use ironval::testing::*;
use ironval::*;

#[test]
fn one_file_per_key_one_line_per_gpi() -> Result<()> {
    let mut a = InMemoryReader::new();
    let mut b = InMemoryReader::new();
    let mut c = InMemoryReader::new();
    for gpi in [10, 11] {
        let signal = soil_moisture_signal(40, gpi);
        a.insert(gpi, daily_frame("sm", &signal));
        b.insert(gpi, daily_frame("sm", &linear(&signal, 0.8, 0.05)));
        c.insert(gpi, daily_frame("ssm", &linear(&signal, 1.2, -0.01)));
    }
    let validation = Validation::builder()
        .dataset(DatasetSpec::new("ISMN", a, ["sm"]))
        .dataset(DatasetSpec::new("ASCAT", b, ["sm"]))
        .dataset(DatasetSpec::new("SMOS", c, ["ssm"]))
        .metric(2, 2, BasicMetrics)
        .build()?;

    let dir = tempfile::tempdir()?;
    let mut writer = JsonlResultsWriter::new(dir.path());
    let jobs = [Job::new(10, 1.0, 2.0), Job::new(11, 3.0, 4.0)];
    JobRunner::sequential().run_into(&validation, &jobs, &mut writer)?;
    // Rerunning a job leaves the files unchanged.
    JobRunner::sequential().run_into(&validation, &jobs[..1], &mut writer)?;

    let ascat = read_results(dir.path().join("ISMN.sm_with_ASCAT.sm.jsonl"))?;
    let smos = read_results(dir.path().join("ISMN.sm_with_SMOS.ssm.jsonl"))?;
    assert_eq!(ascat.len(), 2);
    assert_eq!(smos.len(), 2);
    assert_eq!(ascat[0]["gpi"], 10);
    assert_eq!(ascat[1]["lat"], 4.0);
    assert_eq!(ascat[0]["n_obs"], 40);
    let r = ascat[0]["R"][0].as_f64().unwrap_or(f64::NAN);
    assert_close(r, 1.0, 1e-9);
    Ok(())
}
