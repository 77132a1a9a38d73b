use chrono::{Local, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tempfile::NamedTempFile;

use crate::error::Result;

/// Number of entries returned by [`Insights::top_misspellings`]
pub const TOP_MISSPELLINGS: usize = 5;

/// Number of speed samples returned by [`Insights::last_speeds`]
pub const SPEED_WINDOW: usize = 7;

/// One typing speed measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    /// Day the sample was taken, stored as `YYYY-MM-DD`
    pub date: NaiveDate,

    /// Words per minute
    pub wpm: f64,
}

/// The persisted stats document
///
/// Both keys are required on disk. A file missing either one is treated as
/// corrupt rather than silently reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsDocument {
    /// Tracked token -> number of requests it appeared in
    pub misspelled: BTreeMap<String, u64>,

    /// Every sample ever recorded, oldest first
    pub typing_speed: Vec<SpeedSample>,
}

/// Summary view served by the insights endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    /// Most frequent misspellings, highest count first
    #[serde(rename = "misspelled")]
    pub top_misspellings: Vec<(String, u64)>,

    /// Most recent speed samples, oldest first
    #[serde(rename = "typing_speed")]
    pub last_speeds: Vec<SpeedSample>,
}

impl Insights {
    /// Project a document onto its summary
    ///
    /// Counts are sorted descending. The sort is stable over the document's
    /// token order, so equal counts come out in ascending token order.
    pub fn from_document(doc: &StatsDocument) -> Self {
        let mut top_misspellings: Vec<(String, u64)> = doc
            .misspelled
            .iter()
            .map(|(token, count)| (token.clone(), *count))
            .collect();
        top_misspellings.sort_by(|a, b| b.1.cmp(&a.1));
        top_misspellings.truncate(TOP_MISSPELLINGS);

        let start = doc.typing_speed.len().saturating_sub(SPEED_WINDOW);
        let last_speeds = doc.typing_speed[start..].to_vec();

        Self {
            top_misspellings,
            last_speeds,
        }
    }
}

/// Placeholder speed metric: half the whitespace-separated word count
pub fn mock_wpm(text: &str) -> f64 {
    text.split_whitespace().count() as f64 / 2.0
}

/// JSON file holding misspelling counts and speed history
///
/// Every mutation loads the whole document, changes it, and writes it back
/// through a temporary file that is renamed over the original. The
/// read-modify-write cycle runs under a single lock, so concurrent callers
/// never lose each other's updates.
#[derive(Debug)]
pub struct StatsStore {
    path: PathBuf,
    tracked: Vec<String>,
    lock: Mutex<()>,
}

impl StatsStore {
    /// Open the store, creating an empty document if the file is missing
    ///
    /// The parent directory must already exist.
    ///
    /// # Arguments
    /// * `path` - Location of the JSON document
    /// * `tracked` - Tokens whose presence is counted by [`StatsStore::record_correction`]
    ///
    /// # Errors
    /// * `Error::StorageUnavailable` if the document cannot be created, or the
    ///   path exists but is not a regular file
    pub fn open<P: AsRef<Path>>(path: P, tracked: &[String]) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            tracked: tracked.to_vec(),
            lock: Mutex::new(()),
        };

        if !store.path.exists() {
            store.save(&StatsDocument::default())?;
            info!("Created stats document at {}", store.path.display());
        } else if !store.path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", store.path.display()),
            )
            .into());
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tracked(&self) -> &[String] {
        &self.tracked
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The lock guards no data, so a panic elsewhere cannot leave it inconsistent
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the whole document from disk
    ///
    /// # Errors
    /// * `Error::StorageUnavailable` if the file cannot be opened or read
    /// * `Error::CorruptDocument` if the content is not a stats document
    pub fn load(&self) -> Result<StatsDocument> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let doc = serde_json::from_reader(reader)?;
        Ok(doc)
    }

    fn save(&self, doc: &StatsDocument) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, doc).map_err(io::Error::from)?;
            writer.flush()?;
        }
        // The temp file starts out owner-only; keep whatever mode the document had
        if let Ok(metadata) = fs::metadata(&self.path) {
            temp.as_file().set_permissions(metadata.permissions())?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Record one correction request, dated today (local time)
    pub fn record_correction(&self, original: &str, corrected: &str) -> Result<SpeedSample> {
        self.record_correction_on(original, corrected, Local::now().date_naive())
    }

    /// Record one correction request with an explicit date
    ///
    /// When the text changed, every tracked token found in `original`
    /// (ignoring case) gains one count, however many times it occurs. A
    /// speed sample is appended either way.
    ///
    /// # Returns
    /// * `SpeedSample` - The sample that was appended
    ///
    /// # Errors
    /// * `Error::StorageUnavailable` or `Error::CorruptDocument`; on error the
    ///   document on disk is left as it was
    pub fn record_correction_on(
        &self,
        original: &str,
        corrected: &str,
        date: NaiveDate,
    ) -> Result<SpeedSample> {
        let _guard = self.guard();
        let mut doc = self.load()?;

        if original != corrected {
            let lowered = original.to_lowercase();
            for token in self.tracked.iter().filter(|t| lowered.contains(t.as_str())) {
                *doc.misspelled.entry(token.clone()).or_insert(0) += 1;
            }
        }

        let sample = SpeedSample {
            date,
            wpm: mock_wpm(original),
        };
        doc.typing_speed.push(sample.clone());

        self.save(&doc)?;
        debug!(
            "Recorded correction: {} samples, {} tracked tokens",
            doc.typing_speed.len(),
            doc.misspelled.len()
        );

        Ok(sample)
    }

    /// Current summary of the stored statistics
    pub fn insights(&self) -> Result<Insights> {
        let _guard = self.guard();
        let doc = self.load()?;
        Ok(Insights::from_document(&doc))
    }

    /// Wait for any in-flight write and release the store
    pub fn close(self) {
        let _guard = self.guard();
        info!("Stats store at {} closed", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrector::RuleTable;
    use crate::error::Error;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> StatsStore {
        let table = RuleTable::default();
        StatsStore::open(dir.path().join("user_data.json"), table.tracked()).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_open_creates_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"misspelled":{},"typing_speed":[]}"#);
        assert_eq!(store.load().unwrap(), StatsDocument::default());
    }

    #[test]
    fn test_open_keeps_existing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_data.json");
        fs::write(
            &path,
            r#"{"misspelled":{"teh":3},"typing_speed":[{"date":"2024-05-01","wpm":1.5}]}"#,
        )
        .unwrap();

        let store = StatsStore::open(&path, RuleTable::default().tracked()).unwrap();
        let doc = store.load().unwrap();
        assert_eq!(doc.misspelled.get("teh"), Some(&3));
        assert_eq!(doc.typing_speed, vec![SpeedSample { date: day(1), wpm: 1.5 }]);
    }

    #[test]
    fn test_unchanged_text_only_appends_sample() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let sample = store.record_correction_on("TEH cat", "TEH cat", day(2)).unwrap();
        assert_eq!(sample, SpeedSample { date: day(2), wpm: 1.0 });

        let doc = store.load().unwrap();
        assert!(doc.misspelled.is_empty());
        assert_eq!(doc.typing_speed.len(), 1);
    }

    #[test]
    fn test_presence_counts_once_per_request() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.record_correction_on("teh teh", "the the", day(1)).unwrap();
        assert_eq!(store.load().unwrap().misspelled.get("teh"), Some(&1));

        store.record_correction_on("teh teh teh", "the the the", day(1)).unwrap();
        assert_eq!(store.load().unwrap().misspelled.get("teh"), Some(&2));
    }

    #[test]
    fn test_tracking_ignores_case_once_text_changed() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        // Only "adn" is corrected, but "TAHT" still counts
        store.record_correction_on("adn TAHT", "and TAHT", day(1)).unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc.misspelled.get("adn"), Some(&1));
        assert_eq!(doc.misspelled.get("taht"), Some(&1));
        assert_eq!(doc.misspelled.len(), 2);
    }

    #[test]
    fn test_untracked_token_is_never_counted() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.record_correction_on("a msitake", "a mistake", day(1)).unwrap();

        let doc = store.load().unwrap();
        assert!(doc.misspelled.is_empty());
        assert_eq!(doc.typing_speed[0].wpm, 1.0);
    }

    #[test]
    fn test_mock_wpm() {
        assert_eq!(mock_wpm(""), 0.0);
        assert_eq!(mock_wpm("one"), 0.5);
        assert_eq!(mock_wpm("  one\ttwo\nthree  "), 1.5);
    }

    #[test]
    fn test_insights_top_misspellings() {
        let mut doc = StatsDocument::default();
        for (token, count) in [("a", 1), ("b", 7), ("c", 3), ("d", 7), ("e", 2), ("f", 5)] {
            doc.misspelled.insert(token.to_string(), count);
        }

        let insights = Insights::from_document(&doc);
        let expected: Vec<(String, u64)> = [("b", 7), ("d", 7), ("f", 5), ("c", 3), ("e", 2)]
            .iter()
            .map(|(t, c)| (t.to_string(), *c))
            .collect();
        assert_eq!(insights.top_misspellings, expected);
    }

    #[test]
    fn test_insights_last_speeds_window() {
        let mut doc = StatsDocument::default();
        for d in 1..=10 {
            doc.typing_speed.push(SpeedSample { date: day(d), wpm: d as f64 });
        }

        let insights = Insights::from_document(&doc);
        assert_eq!(insights.last_speeds.len(), SPEED_WINDOW);
        let dates: Vec<NaiveDate> = insights.last_speeds.iter().map(|s| s.date).collect();
        assert_eq!(dates, (4..=10).map(day).collect::<Vec<_>>());

        doc.typing_speed.truncate(3);
        assert_eq!(Insights::from_document(&doc).last_speeds.len(), 3);
    }

    #[test]
    fn test_insights_serialize_as_pairs() {
        let mut doc = StatsDocument::default();
        doc.misspelled.insert("teh".to_string(), 2);
        doc.typing_speed.push(SpeedSample { date: day(9), wpm: 2.5 });

        let json = serde_json::to_value(Insights::from_document(&doc)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "misspelled": [["teh", 2]],
                "typing_speed": [{"date": "2024-05-09", "wpm": 2.5}]
            })
        );
    }

    #[test]
    fn test_corrupt_document_is_reported_not_reset() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        fs::write(store.path(), "not json").unwrap();

        let result = store.record_correction_on("teh", "the", day(1));
        assert!(matches!(result, Err(Error::CorruptDocument(_))));
        assert!(matches!(store.insights(), Err(Error::CorruptDocument(_))));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "not json");
    }

    #[test]
    fn test_missing_key_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        fs::write(store.path(), r#"{"misspelled":{}}"#).unwrap();

        assert!(matches!(store.load(), Err(Error::CorruptDocument(_))));
    }

    #[test]
    fn test_missing_directory_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("user_data.json");

        let result = StatsStore::open(path, &[]);
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }

    #[test]
    fn test_directory_path_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_data.json");
        fs::create_dir(&path).unwrap();

        let result = StatsStore::open(&path, &[]);
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_keeps_document_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.record_correction_on("teh", "the", day(1)).unwrap();
        store.record_correction_on("adn", "and", day(2)).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(store.load().unwrap().typing_speed.len(), 2);
    }

    #[test]
    fn test_deleted_document_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        fs::remove_file(store.path()).unwrap();

        assert!(matches!(store.insights(), Err(Error::StorageUnavailable(_))));
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        const WRITERS: usize = 16;

        let dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(&dir));

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.record_correction_on("teh", "the", day(1)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let doc = store.load().unwrap();
        assert_eq!(doc.typing_speed.len(), WRITERS);
        assert_eq!(doc.misspelled.get("teh"), Some(&(WRITERS as u64)));
    }

    #[test]
    fn test_close_releases_store() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let path = store.path().to_path_buf();
        store.close();
        assert!(path.exists());
    }
}
