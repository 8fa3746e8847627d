pub mod assistant;
pub mod inference;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub use assistant::{Assistant, AssistantError, Journal, ModelUpdate};
pub use inference::{
    ChunkStream, ClientConfig, Dialect, EndpointConfig, InferenceClient, InferenceError,
    ModelDescriptor,
};

const LOG_FILE_NAME: &str = "assistant-gm.log";
const DEFAULT_LOG_FILTER: &str = "assistant_gm=info,warn";

/// Return the platform-standard data directory for AssistantGM.
///
/// - macOS: `~/Library/Application Support/assistant-gm/`
/// - Windows: `{FOLDERID_RoamingAppData}\assistant-gm\`
/// - Linux: `$XDG_DATA_HOME/assistant-gm/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.assistant-gm/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("assistant-gm");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".assistant-gm")
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Initialize tracing to a log file in `log_dir` (default: [`data_dir`]).
///
/// Entry point for hosts embedding the library, and for the CLI's
/// `--log-dir`. Rotates the previous logs (keeps three), then writes through
/// a line-flushing writer so entries survive a crash of the host process.
/// Returns the log file path.
pub fn init_tracing(log_dir: Option<&Path>) -> std::io::Result<PathBuf> {
    let log_dir = log_dir.map(Path::to_path_buf).unwrap_or_else(data_dir);
    std::fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join(LOG_FILE_NAME);
    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(std::io::Error::other)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== AssistantGM starting ==="
    );
    Ok(log_path)
}

/// Initialize tracing to stderr, for the command-line front end.
pub fn init_stderr_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("assistant_gm=debug,info")
    } else {
        env_filter()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Rotate log files: `x.log` → `x.log.1` → … → `x.log.{keep}`.
///
/// The oldest file beyond `keep` is deleted; gaps in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let numbered = |i: u32| PathBuf::from(format!("{}.{i}", base_path.display()));

    let _ = std::fs::remove_file(numbered(keep));
    for i in (1..keep).rev() {
        let _ = std::fs::rename(numbered(i), numbered(i + 1));
    }
    if base_path.exists() {
        let _ = std::fs::rename(base_path, numbered(1));
    }
}

/// A log writer that flushes after every write.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    fn lock(&self) -> std::io::Result<std::sync::MutexGuard<'_, std::fs::File>> {
        self.file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self.lock()?;
        let n = file.write(buf)?;
        file.flush()?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.lock()?.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_log_file_shifts_and_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join(LOG_FILE_NAME);
        let numbered = |i: u32| PathBuf::from(format!("{}.{i}", base.display()));

        std::fs::write(&base, "current").unwrap();
        std::fs::write(numbered(1), "one").unwrap();
        std::fs::write(numbered(2), "two").unwrap();

        rotate_log_file(&base, 2);

        assert!(!base.exists());
        assert_eq!(std::fs::read_to_string(numbered(1)).unwrap(), "current");
        assert_eq!(std::fs::read_to_string(numbered(2)).unwrap(), "one");
        assert!(!numbered(3).exists());
    }

    #[test]
    fn test_flushing_writer_writes_through() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.log");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = FlushingWriter::new(file);
        writer.write_all(b"line\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }

    #[test]
    fn test_init_tracing_writes_rotated_log_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOG_FILE_NAME), "previous run\n").unwrap();

        let path = init_tracing(Some(dir.path())).unwrap();

        assert_eq!(path, dir.path().join(LOG_FILE_NAME));
        let previous = PathBuf::from(format!("{}.1", path.display()));
        assert_eq!(std::fs::read_to_string(previous).unwrap(), "previous run\n");
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("AssistantGM starting"));
    }

    #[test]
    fn test_data_dir_is_named_for_the_app() {
        let dir = data_dir();
        let name = dir.file_name().unwrap().to_string_lossy();
        assert!(name.contains("assistant-gm"));
    }
}
