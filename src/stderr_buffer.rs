use std::io::{self, Write};
use std::sync::Mutex;

static BUFFER: Mutex<Option<Vec<String>>> = Mutex::new(None);

/// Activate buffering. While active, log records are stored instead of
/// being printed to stderr.
pub fn activate() {
    *BUFFER.lock().unwrap() = Some(Vec::new());
}

/// Deactivate buffering and return all collected messages.
pub fn drain() -> Vec<String> {
    BUFFER.lock().unwrap().take().unwrap_or_default()
}

/// Store `msg` if buffering is active; otherwise print it to stderr.
pub fn warn(msg: String) {
    let mut guard = BUFFER.lock().unwrap();
    if let Some(buf) = guard.as_mut() {
        buf.push(msg);
    } else {
        drop(guard);
        eprintln!("{}", msg);
    }
}

/// Writer that routes through the buffer. Used as the env_logger target so
/// log output never lands on top of the TUI.
pub struct BufferedStderr;

impl Write for BufferedStderr {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end_matches('\n');
        if !text.is_empty() {
            warn(text.to_string());
        }
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Initialize logging. `verbose` raises the default level to debug;
/// `RUST_LOG` still overrides either default.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "relwatch=debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .target(env_logger::Target::Pipe(Box::new(BufferedStderr)))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so parallel tests never race on the global buffer
    #[test]
    fn test_buffer_collects_while_active() {
        activate();
        warn("first".to_string());
        BufferedStderr.write_all(b"second\n").unwrap();
        BufferedStderr.write_all(b"\n").unwrap();

        assert_eq!(drain(), vec!["first".to_string(), "second".to_string()]);
        assert!(drain().is_empty());
    }
}
