//! Merges every backup CSV in a directory into today's `backup_YYYY-MM-DD.csv`.

use crate::adapters::csv_format::strip_bom;
use crate::utils::error::{Result, ScoutError};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub path: PathBuf,
    pub sources: usize,
    pub appended: usize,
}

pub fn backup_filename(today: NaiveDate) -> String {
    format!("backup_{}.csv", today.format("%Y-%m-%d"))
}

struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn read_table(path: &Path) -> Result<CsvTable> {
    let data = fs::read(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(strip_bom(&data));
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|row| row.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;
    Ok(CsvTable { headers, rows })
}

/// Index of the `job_id` (or legacy `JobID`, `Job ID`) column.
fn id_column(headers: &[String]) -> Option<usize> {
    headers.iter().position(|h| {
        let key: String = h.trim().chars().filter(|c| *c != '_' && *c != ' ').collect();
        key.eq_ignore_ascii_case("jobid")
    })
}

fn encode_rows(rows: &[Vec<String>], header: Option<&[String]>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if let Some(header) = header {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ScoutError::processing(format!("CSV buffer flush failed: {}", e)))
}

/// Appends rows from every other `*.csv` in `dir` whose job id is not yet in
/// today's backup. Columns are matched by header name.
pub fn consolidate_backups(dir: &Path, today: NaiveDate) -> Result<BackupSummary> {
    fs::create_dir_all(dir)?;
    let target = dir.join(backup_filename(today));

    let mut sources: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .filter(|p| *p != target)
        .collect();
    sources.sort();

    if sources.is_empty() {
        tracing::info!("No backup CSV files found in {}", dir.display());
        return Ok(BackupSummary {
            path: target,
            sources: 0,
            appended: 0,
        });
    }

    let (headers, mut known, created) = if target.exists() {
        let table = read_table(&target)?;
        let known: HashSet<String> = match id_column(&table.headers) {
            Some(idx) => table
                .rows
                .iter()
                .filter_map(|row| row.get(idx).cloned())
                .collect(),
            None => HashSet::new(),
        };
        (table.headers, known, false)
    } else {
        let mut headers = None;
        for source in &sources {
            let table = read_table(source)?;
            if id_column(&table.headers).is_some() {
                headers = Some(table.headers);
                break;
            }
        }
        let Some(headers) = headers else {
            return Err(ScoutError::processing(format!(
                "no backup in {} has a job id column",
                dir.display()
            )));
        };
        (headers, HashSet::new(), true)
    };

    let Some(target_id) = id_column(&headers) else {
        return Err(ScoutError::processing(format!(
            "{} has no job id column",
            target.display()
        )));
    };

    if created {
        fs::write(&target, encode_rows(&[], Some(headers.as_slice()))?)?;
        tracing::info!("Created {}", target.display());
    }

    let mut fresh: Vec<Vec<String>> = Vec::new();
    for source in &sources {
        let table = read_table(source)?;
        let Some(source_id) = id_column(&table.headers) else {
            tracing::warn!("Skipping {}: no job id column", source.display());
            continue;
        };

        let mapping: Vec<Option<usize>> = headers
            .iter()
            .map(|h| table.headers.iter().position(|s| s == h))
            .collect();

        for row in &table.rows {
            let id = row.get(source_id).map(|s| s.trim()).unwrap_or_default();
            if id.is_empty() || !known.insert(id.to_string()) {
                continue;
            }
            let mut out: Vec<String> = mapping
                .iter()
                .map(|m| m.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                .collect();
            out[target_id] = id.to_string();
            fresh.push(out);
        }
    }

    if fresh.is_empty() {
        tracing::info!("No new unique jobs to append");
    } else {
        let mut file = fs::OpenOptions::new().append(true).open(&target)?;
        file.write_all(&encode_rows(&fresh, None)?)?;
        tracing::info!(
            "Appended {} new unique jobs to {}",
            fresh.len(),
            target.display()
        );
    }

    Ok(BackupSummary {
        path: target,
        sources: sources.len(),
        appended: fresh.len(),
    })
}
