//! CSV result tables: the wide scoring results, the allocation table, and
//! reading scores back in for a standalone allocation run.

use std::collections::BTreeMap;
use std::path::Path;

use oso_core::error::SourceError;
use oso_core::types::Allocation;
use oso_scoring::FinalResults;
use serde::Deserialize;
use tracing::{debug, info};

const INDEX_COLUMNS: [&str; 3] = ["project_id", "project_name", "display_name"];

fn io_error(path: &Path, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn csv_error(path: &Path, e: csv::Error) -> SourceError {
    SourceError::Csv {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>, SourceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
    }
    csv::Writer::from_path(path).map_err(|e| csv_error(path, e))
}

/// Write the wide results table, index columns first.
pub fn write_results(path: impl AsRef<Path>, results: &FinalResults) -> Result<(), SourceError> {
    let path = path.as_ref();
    let mut w = writer(path)?;

    let header: Vec<&str> = INDEX_COLUMNS.iter().copied().chain(results.header()).collect();
    w.write_record(&header).map_err(|e| csv_error(path, e))?;

    for row in &results.rows {
        let p = &row.project;
        let record: Vec<String> = [p.project_id.clone(), p.project_name.clone(), p.display_name.clone()]
            .into_iter()
            .chain(row.values.iter().map(f64::to_string))
            .chain(std::iter::once(row.weighted_score.to_string()))
            .collect();
        w.write_record(&record).map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| io_error(path, e))?;

    info!(path = %path.display(), projects = results.len(), "wrote scoring results");
    Ok(())
}

/// Write `project_id, amount`, largest amount first.
pub fn write_allocations(path: impl AsRef<Path>, allocation: &Allocation) -> Result<(), SourceError> {
    let path = path.as_ref();
    let mut w = writer(path)?;
    w.write_record(["project_id", "amount"])
        .map_err(|e| csv_error(path, e))?;
    for (id, amount) in allocation.ranked() {
        w.write_record([id.to_string(), amount.to_string()])
            .map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| io_error(path, e))?;

    info!(path = %path.display(), projects = allocation.amounts.len(), "wrote allocations");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ScoreRecord {
    project_id: String,
    weighted_score: String,
}

/// Read `project_id` and `weighted_score` from a results CSV.
///
/// Other columns are ignored, so a file from [`write_results`] reads back
/// directly.
pub fn read_scores(path: impl AsRef<Path>) -> Result<BTreeMap<String, f64>, SourceError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| io_error(path, e))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut scores = BTreeMap::new();
    for (idx, record) in reader.deserialize::<ScoreRecord>().enumerate() {
        let r = record.map_err(|e| csv_error(path, e))?;
        let score: f64 = r.weighted_score.parse().map_err(|_| SourceError::InvalidAmount {
            path: path.display().to_string(),
            row: idx + 2,
            value: r.weighted_score.clone(),
        })?;
        *scores.entry(r.project_id).or_insert(0.0) += score;
    }
    debug!(path = %path.display(), projects = scores.len(), "read scores");
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oso_core::table::Table;
    use oso_core::types::{PeriodMetric, ProjectKey, Variant, VariantColumn};

    fn results() -> FinalResults {
        let a = ProjectKey::new("a", "alpha", "Alpha, Inc");
        let b = ProjectKey::new("b", "beta", "Beta");
        let mut raw = Table::new(vec![PeriodMetric::new("Jan 2025", "gas")]);
        raw.insert_row(a.clone(), vec![3.0]);
        raw.insert_row(b.clone(), vec![1.0]);
        let mut var = Table::new(vec![VariantColumn::new("gas", Variant::Adoption)]);
        var.insert_row(a.clone(), vec![1.0]);
        var.insert_row(b.clone(), vec![0.0]);
        let shares = BTreeMap::from([(a, 0.75), (b, 0.25)]);
        FinalResults::build(&raw, &var, &var, &shares)
    }

    #[test]
    fn results_round_trip_through_read_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/results.csv");
        write_results(&path, &results()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "project_id,project_name,display_name,gas [Jan 2025],gas - adoption_variant,gas - adoption_variant - weighted,weighted_score"
        );
        // Quoted because of the comma.
        assert!(text.contains("\"Alpha, Inc\""));

        let scores = read_scores(&path).unwrap();
        assert_eq!(scores["a"], 0.75);
        assert_eq!(scores["b"], 0.25);
    }

    #[test]
    fn allocations_sorted_descending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alloc.csv");
        let allocation = Allocation {
            amounts: BTreeMap::from([
                ("a".to_string(), 100.0),
                ("b".to_string(), 250.5),
                ("c".to_string(), 0.0),
            ]),
            total: 350.5,
            norm_iterations: 0,
            converged: true,
        };
        write_allocations(&path, &allocation).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["project_id,amount", "b,250.5", "a,100", "c,0"]);
    }

    #[test]
    fn read_scores_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        std::fs::write(&path, "project_id,weighted_score\na,0.5\nb,half\n").unwrap();
        assert!(matches!(
            read_scores(&path).unwrap_err(),
            SourceError::InvalidAmount { row: 3, .. }
        ));
    }

    #[test]
    fn read_scores_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        std::fs::write(&path, "project_id,score\na,0.5\n").unwrap();
        assert!(matches!(read_scores(&path).unwrap_err(), SourceError::Csv { .. }));
    }
}
