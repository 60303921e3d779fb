//! Coverage command handlers

use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use chainfuzz::coverage::{merge, ranked_functions, read_coverage_file, MergedCoverage};
use std::fs;
use std::path::{Path, PathBuf};

/// Merge coverage files as if each came from a separate worker
pub fn merge_files(files: &[PathBuf]) -> CliResult<MergedCoverage> {
    if files.is_empty() {
        return Err(CliError::invalid_argument("no coverage files given"));
    }
    let records = files
        .iter()
        .map(|path| read_coverage_file(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge(&records))
}

/// Execute `coverage merge`
pub fn execute_merge(reporter: &Reporter, files: &[PathBuf], output: &Path) -> CliResult<()> {
    let merged = merge_files(files)?;
    fs::write(output, merged.to_json_pretty()?)?;
    reporter.success(&format!(
        "merged {} files ({} hits) into {}",
        files.len(),
        merged.total_hits(),
        output.display()
    ));
    Ok(())
}

/// Function table, highest hit count first
#[must_use]
pub fn render_summary(coverage: &MergedCoverage) -> String {
    let ranked = ranked_functions(coverage);
    let width = ranked
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0)
        .max("Function".len());
    let mut out = format!("{:<width$}  Hits\n", "Function");
    for (name, hits) in &ranked {
        out.push_str(&format!("{name:<width$}  {hits}\n"));
    }
    out.push_str(&format!("{:<width$}  {}\n", "Total", coverage.total_hits()));
    out
}

/// Execute `coverage summary`
pub fn execute_summary(file: &Path) -> CliResult<()> {
    let record = read_coverage_file(file)?;
    print!("{}", render_summary(&merge([&record])));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chainfuzz::coverage::{FunctionCoverageRecord, IdeCoverage, IdePosition};

    fn write_record(dir: &Path, name: &str, hits: u64) -> PathBuf {
        let mut record = IdeCoverage::new();
        record.entry("A.sol".to_string()).or_default().insert(
            IdePosition::new(10, 0, 10, 20),
            FunctionCoverageRecord::new("transfer", hits),
        );
        let path = dir.join(name);
        fs::write(&path, merge([&record]).to_json_pretty().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_merge_files_sums_hits() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![write_record(dir.path(), "a.cov", 5), write_record(dir.path(), "b.cov", 5)];
        let merged = merge_files(&files).unwrap();
        assert_eq!(merged.hits("A.sol", &IdePosition::new(10, 0, 10, 20)), Some(10));
    }

    #[test]
    fn test_merge_requires_files() {
        assert!(merge_files(&[]).is_err());
    }

    #[test]
    fn test_render_summary() {
        let dir = tempfile::tempdir().unwrap();
        let merged = merge_files(&[write_record(dir.path(), "a.cov", 7)]).unwrap();
        let table = render_summary(&merged);
        assert!(table.starts_with("Function  Hits\n"));
        assert!(table.contains("transfer  7\n"));
        assert!(table.ends_with("Total     7\n"));
    }
}
