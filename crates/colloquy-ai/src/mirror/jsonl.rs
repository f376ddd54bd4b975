use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use colloquy_core::{MirrorError, MirrorRecord, MirrorSink};

/// Default size that triggers rotation (10 MB).
pub const DEFAULT_ROTATE_BYTES: u64 = 10 * 1024 * 1024;
/// Rotated generations kept beside the live file.
const KEEP_ROTATED: usize = 3;

const FILE_STEM: &str = "transcript_mirror";

/// Append-only JSONL copy of every resolved exchange.
///
/// One [`MirrorRecord`] per line. Independent of the in-memory transcript:
/// clearing a session does not truncate the file.
pub struct JsonlMirror {
    writer: Arc<Mutex<BufWriter<fs::File>>>,
    path: PathBuf,
}

impl JsonlMirror {
    /// Open or create the mirror file under `dir`, rotating at the default size.
    pub fn open(dir: &Path) -> Result<Self, MirrorError> {
        Self::open_with_rotation(dir, DEFAULT_ROTATE_BYTES)
    }

    /// Open or create the mirror file under `dir`.
    ///
    /// An existing file larger than `rotate_bytes` is shifted to
    /// `transcript_mirror.1.jsonl` first and writing starts on an empty file.
    pub fn open_with_rotation(dir: &Path, rotate_bytes: u64) -> Result<Self, MirrorError> {
        fs::create_dir_all(dir)?;
        let path = live_path(dir);

        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if size > rotate_bytes {
            shift_generations(dir)?;
            tracing::info!("Rotated transcript mirror ({size} bytes)");
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!("Transcript mirror: {}", path.display());
        Ok(Self {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the `max_entries` most recent records from the live file in `dir`.
    /// Unreadable lines are skipped; a missing file yields an empty vec.
    pub fn load_recent(dir: &Path, max_entries: usize) -> Vec<MirrorRecord> {
        let file = match fs::File::open(live_path(dir)) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let mut records: Vec<MirrorRecord> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        if records.len() > max_entries {
            records.drain(..records.len() - max_entries);
        }
        records
    }
}

fn live_path(dir: &Path) -> PathBuf {
    dir.join(format!("{FILE_STEM}.jsonl"))
}

fn generation_path(dir: &Path, n: usize) -> PathBuf {
    dir.join(format!("{FILE_STEM}.{n}.jsonl"))
}

/// live -> .1 -> .2 -> .3; the oldest generation is discarded.
fn shift_generations(dir: &Path) -> io::Result<()> {
    match fs::remove_file(generation_path(dir, KEEP_ROTATED)) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    for n in (1..KEEP_ROTATED).rev() {
        let from = generation_path(dir, n);
        if from.exists() {
            fs::rename(&from, generation_path(dir, n + 1))?;
        }
    }
    fs::rename(live_path(dir), generation_path(dir, 1))
}

fn append_line(writer: &Mutex<BufWriter<fs::File>>, line: &str) -> io::Result<()> {
    let mut writer = writer
        .lock()
        .map_err(|_| io::Error::other("mirror writer lock poisoned"))?;
    writeln!(writer, "{line}")?;
    writer.flush()
}

#[async_trait]
impl MirrorSink for JsonlMirror {
    async fn mirror(&self, record: &MirrorRecord) -> Result<(), MirrorError> {
        let line = serde_json::to_string(record)?;
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || append_line(&writer, &line))
            .await
            .map_err(io::Error::other)??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::{Exchange, ExchangeStatus};

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("colloquy-mirror-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn writes_one_line_per_record() {
        let dir = test_dir("write");
        let mirror = JsonlMirror::open(&dir).unwrap();

        let first = Exchange::answered("hello", "hi");
        let second = Exchange::resolved(
            "rude",
            "blocked",
            ExchangeStatus::BlockedInput,
            vec!["profanity".into()],
        );
        mirror.mirror(&MirrorRecord::from(&first)).await.unwrap();
        mirror.mirror(&MirrorRecord::from(&second)).await.unwrap();

        let content = fs::read_to_string(mirror.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"user_message\":\"hello\""));
        assert!(lines[1].contains("BLOCKED_INPUT"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn reopen_appends() {
        let dir = test_dir("append");
        {
            let mirror = JsonlMirror::open(&dir).unwrap();
            mirror
                .mirror(&MirrorRecord::from(&Exchange::answered("one", "1")))
                .await
                .unwrap();
        }
        {
            let mirror = JsonlMirror::open(&dir).unwrap();
            mirror
                .mirror(&MirrorRecord::from(&Exchange::answered("two", "2")))
                .await
                .unwrap();
        }

        let records = JsonlMirror::load_recent(&dir, 10);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_message, "one");
        assert_eq!(records[1].user_message, "two");

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn load_recent_caps_entries() {
        let dir = test_dir("cap");
        let mirror = JsonlMirror::open(&dir).unwrap();
        for i in 0..10 {
            let ex = Exchange::answered(format!("msg {i}"), "ok");
            mirror.mirror(&MirrorRecord::from(&ex)).await.unwrap();
        }

        let records = JsonlMirror::load_recent(&dir, 3);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].user_message, "msg 7");
        assert_eq!(records[2].user_message, "msg 9");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_recent_skips_garbage_lines() {
        let dir = test_dir("garbage");
        fs::create_dir_all(&dir).unwrap();
        let good = serde_json::to_string(&MirrorRecord::from(&Exchange::answered("ok", "fine"))).unwrap();
        fs::write(live_path(&dir), format!("not json\n\n{good}\n")).unwrap();

        let records = JsonlMirror::load_recent(&dir, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bot_response, "fine");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_recent_missing_dir_returns_empty() {
        let dir = test_dir("missing");
        assert!(JsonlMirror::load_recent(&dir, 50).is_empty());
    }

    #[tokio::test]
    async fn oversized_file_rotates_on_open() {
        let dir = test_dir("rotate");
        fs::create_dir_all(&dir).unwrap();
        let old = serde_json::to_string(&MirrorRecord::from(&Exchange::answered("old", "1"))).unwrap();
        fs::write(live_path(&dir), format!("{old}\n")).unwrap();

        let mirror = JsonlMirror::open_with_rotation(&dir, 8).unwrap();
        assert_eq!(fs::metadata(mirror.path()).unwrap().len(), 0);
        assert!(fs::read_to_string(generation_path(&dir, 1))
            .unwrap()
            .contains("\"user_message\":\"old\""));

        mirror
            .mirror(&MirrorRecord::from(&Exchange::answered("new", "2")))
            .await
            .unwrap();
        let records = JsonlMirror::load_recent(&dir, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_message, "new");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rotation_keeps_three_generations() {
        let dir = test_dir("generations");
        fs::create_dir_all(&dir).unwrap();
        for n in 1..=KEEP_ROTATED {
            fs::write(generation_path(&dir, n), format!("gen {n}\n")).unwrap();
        }
        fs::write(live_path(&dir), "live contents\n").unwrap();

        JsonlMirror::open_with_rotation(&dir, 4).unwrap();

        let read = |n| fs::read_to_string(generation_path(&dir, n)).unwrap();
        assert_eq!(read(1), "live contents\n");
        assert_eq!(read(2), "gen 1\n");
        assert_eq!(read(3), "gen 2\n");
        assert!(!generation_path(&dir, 4).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn small_file_is_not_rotated() {
        let dir = test_dir("norotate");
        fs::create_dir_all(&dir).unwrap();
        fs::write(live_path(&dir), "short\n").unwrap();

        JsonlMirror::open_with_rotation(&dir, 1024).unwrap();

        assert_eq!(fs::read_to_string(live_path(&dir)).unwrap(), "short\n");
        assert!(!generation_path(&dir, 1).exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
