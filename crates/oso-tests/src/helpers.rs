//! Shared test helpers for E2E and invariant tests.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use oso_core::config::{AggregationConfig, ScoringConfig};
use oso_core::types::{MetricObservation, PeriodTag, Variant};

pub const CURRENT: &str = "Jan 2025";
pub const PREVIOUS: &str = "Dec 2024";

/// An observation whose name fields all equal `project`.
pub fn obs(project: &str, chain: &str, period: &str, metric: &str, amount: f64) -> MetricObservation {
    MetricObservation {
        project_id: project.to_string(),
        project_name: project.to_string(),
        display_name: project.to_string(),
        chain: chain.to_string(),
        period_label: period.to_string(),
        metric_name: metric.to_string(),
        amount,
    }
}

/// Jan 2025 / Dec 2024, no chain weights, the given metrics, every variant at 1.0.
pub fn scoring_config(metrics: &[(&str, f64)]) -> ScoringConfig {
    ScoringConfig::new(
        BTreeMap::from([
            (CURRENT.to_string(), PeriodTag::Current),
            (PREVIOUS.to_string(), PeriodTag::Previous),
        ]),
        BTreeMap::new(),
        metrics.iter().map(|(m, w)| (m.to_string(), *w)).collect(),
        Variant::ALL.into_iter().map(|v| (v, 1.0)).collect(),
        AggregationConfig::default(),
    )
    .unwrap()
}

/// Three projects, one metric: a grower, a flat one, and one that dropped to zero.
pub fn three_project_scenario() -> Vec<MetricObservation> {
    vec![
        obs("p1", "BASE", CURRENT, "github_activity", 100.0),
        obs("p1", "BASE", PREVIOUS, "github_activity", 80.0),
        obs("p2", "BASE", CURRENT, "github_activity", 50.0),
        obs("p2", "BASE", PREVIOUS, "github_activity", 50.0),
        obs("p3", "BASE", CURRENT, "github_activity", 0.0),
        obs("p3", "BASE", PREVIOUS, "github_activity", 10.0),
    ]
}

/// Write a projects CSV and a metrics CSV for `observations` into `dir`.
///
/// Period labels are turned back into first-of-month sample dates.
pub fn write_snapshot(dir: &Path, observations: &[MetricObservation]) -> (PathBuf, PathBuf) {
    let mut projects = String::from("project_id,project_name,display_name\n");
    let mut seen = std::collections::BTreeSet::new();
    let mut metrics = String::from("project_id,chain,metric_name,sample_date,amount\n");
    for o in observations {
        if seen.insert(o.project_id.clone()) {
            writeln!(projects, "{},{},{}", o.project_id, o.project_name, o.display_name).unwrap();
        }
        writeln!(
            metrics,
            "{},{},{},{},{}",
            o.project_id,
            o.chain,
            o.metric_name,
            sample_date(&o.period_label),
            o.amount
        )
        .unwrap();
    }
    let projects_path = dir.join("projects_v1.csv");
    let metrics_path = dir.join("onchain_metrics_by_project.csv");
    std::fs::write(&projects_path, projects).unwrap();
    std::fs::write(&metrics_path, metrics).unwrap();
    (projects_path, metrics_path)
}

fn sample_date(label: &str) -> &'static str {
    match label {
        CURRENT => "2025-01-01",
        PREVIOUS => "2024-12-01",
        other => panic!("no sample date for {other}"),
    }
}

/// Model config YAML pointing at `data_dir`.
pub fn model_yaml(data_dir: &Path, metrics: &[(&str, f64)], allocation: Option<&str>) -> String {
    let mut yaml = format!(
        "data_snapshot:\n  data_dir: {}\nsimulation:\n  periods:\n    \"{CURRENT}\": current\n    \"{PREVIOUS}\": previous\n  metrics:\n",
        data_dir.display()
    );
    for (m, w) in metrics {
        writeln!(yaml, "    {m}: {w}").unwrap();
    }
    yaml.push_str("  metric_variants:\n    Adoption: 1.0\n    Growth: 1.0\n    Retention: 1.0\n");
    yaml.push_str("  aggregation:\n    method: power_mean\n    p: 2\n");
    if let Some(section) = allocation {
        yaml.push_str("allocation:\n");
        yaml.push_str(section);
    }
    yaml
}

/// Write `yaml` to `dir/model.yaml` and return the path.
pub fn write_yaml(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("model.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

/// Score shares normalized from arbitrary positive weights, keyed `p000`, `p001`, ...
pub fn normalized_scores(raw: &[f64]) -> BTreeMap<String, f64> {
    let total: f64 = raw.iter().sum();
    raw.iter()
        .enumerate()
        .map(|(i, v)| (format!("p{i:03}"), v / total))
        .collect()
}
