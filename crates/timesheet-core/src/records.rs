use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::classify::{Holiday, LeaveDay};
use crate::config::Config;
use crate::holidays::holidays_between;

/// Read-only view of the holiday and leave lists kept in the data
/// directory. Nothing here writes.
#[derive(Debug)]
pub struct RecordStore {
    pub holidays_path: PathBuf,
    pub leaves_path: PathBuf,
}

impl RecordStore {
    #[tracing::instrument(skip(cfg, data_dir))]
    pub fn open(cfg: &Config, data_dir: &Path) -> Self {
        let holidays_path = cfg
            .get("holidays.file")
            .map(|raw| resolve_in(data_dir, &raw))
            .unwrap_or_else(|| data_dir.join("holidays.jsonl"));
        let leaves_path = cfg
            .get("leaves.file")
            .map(|raw| resolve_in(data_dir, &raw))
            .unwrap_or_else(|| data_dir.join("leaves.jsonl"));

        info!(
            data_dir = %data_dir.display(),
            holidays = %holidays_path.display(),
            leaves = %leaves_path.display(),
            "opened record store"
        );

        Self {
            holidays_path,
            leaves_path,
        }
    }

    /// Stored holidays, or `None` when no holiday file exists.
    #[tracing::instrument(skip(self))]
    pub fn load_holidays(&self) -> anyhow::Result<Option<Vec<Holiday>>> {
        if !self.holidays_path.exists() {
            debug!(file = %self.holidays_path.display(), "no holiday file");
            return Ok(None);
        }
        load_jsonl(&self.holidays_path)
            .context("failed to load holidays")
            .map(Some)
    }

    /// Stored holidays within `[start, end]`, falling back to the
    /// generated French holidays when no file exists.
    #[tracing::instrument(skip(self))]
    pub fn holidays_for(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<Holiday>> {
        match self.load_holidays()? {
            Some(stored) => Ok(stored
                .into_iter()
                .filter(|holiday| holiday.date >= start && holiday.date <= end)
                .collect()),
            None => {
                debug!("using generated holidays");
                Ok(holidays_between(start, end))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn load_leaves(&self) -> anyhow::Result<Vec<LeaveDay>> {
        if !self.leaves_path.exists() {
            debug!(file = %self.leaves_path.display(), "no leave file");
            return Ok(vec![]);
        }
        load_jsonl(&self.leaves_path).context("failed to load leaves")
    }
}

fn resolve_in(data_dir: &Path, raw: &str) -> PathBuf {
    let path = crate::config::expand_tilde(Path::new(raw.trim()));
    if path.is_absolute() {
        path
    } else {
        data_dir.join(path)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    if out.is_empty() {
        warn!(file = %path.display(), "record file is empty");
    }
    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::RecordStore;
    use crate::config::Config;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn missing_files_fall_back_to_generated_holidays_and_no_leave() {
        let temp = tempdir().expect("tempdir");
        let store = RecordStore::open(&Config::default(), temp.path());

        assert!(store.load_holidays().expect("load holidays").is_none());
        assert!(store.load_leaves().expect("load leaves").is_empty());

        let may = store
            .holidays_for(date(2024, 5, 1), date(2024, 5, 31))
            .expect("holidays for may");
        let names: Vec<&str> = may.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Fête du Travail", "Victoire 1945", "Ascension", "Lundi de Pentecôte"]
        );
    }

    #[test]
    fn stored_holidays_replace_generated_ones() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("holidays.jsonl"),
            "{\"date\":\"2024-05-02\",\"name\":\"Pont\"}\n\n{\"date\":\"2024-06-01\",\"name\":\"Later\"}\n",
        )
        .expect("write holidays");

        let store = RecordStore::open(&Config::default(), temp.path());
        let may = store
            .holidays_for(date(2024, 5, 1), date(2024, 5, 31))
            .expect("holidays for may");
        assert_eq!(may.len(), 1);
        assert_eq!(may[0].name, "Pont");
        assert_eq!(may[0].year, 2024);
    }

    #[test]
    fn reports_line_of_bad_record() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("leaves.jsonl"),
            "{\"date\":\"2024-05-02\",\"user_id\":\"a\",\"type\":\"CP\"}\n{\"date\":\"nope\",\"user_id\":\"a\"}\n",
        )
        .expect("write leaves");

        let store = RecordStore::open(&Config::default(), temp.path());
        let err = store.load_leaves().expect_err("bad record");
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn configured_paths_resolve_against_data_dir() {
        let temp = tempdir().expect("tempdir");
        let mut cfg = Config::default();
        cfg.apply_overrides([("rc.leaves.file".to_string(), "team/leave.jsonl".to_string())]);
        let store = RecordStore::open(&cfg, temp.path());
        assert_eq!(store.leaves_path, temp.path().join("team/leave.jsonl"));
        assert_eq!(store.holidays_path, temp.path().join("holidays.jsonl"));
    }
}
