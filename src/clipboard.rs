use crate::error::ClipboardError;
use arboard::Clipboard;
#[cfg(target_os = "linux")]
use arboard::SetExtLinux;
#[cfg(any(target_os = "linux", test))]
use std::io::Read;
#[cfg(any(target_os = "linux", test))]
use std::time::Duration;

pub const DAEMON_FLAG: &str = "__clipboard_daemon";

/// Written by the daemon once it owns the selection.
#[cfg(any(target_os = "linux", test))]
const ACK: u8 = 0x06;

/// How long the parent waits for the daemon to take the selection.
#[cfg(target_os = "linux")]
const ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// Serve stdin as the clipboard selection until another owner replaces it.
///
/// The ack goes out on stdout only after a first plain `set_text` worked, so
/// the parent can tell "copied" from "no clipboard here".
#[cfg(target_os = "linux")]
fn run_daemon_mode() -> anyhow::Result<()> {
    use std::io::Write;

    let text = std::io::read_to_string(std::io::stdin())?;

    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text.clone())?;
    let mut stdout = std::io::stdout();
    stdout.write_all(&[ACK])?;
    stdout.flush()?;

    // Blocks until the selection is taken over by someone else.
    clipboard.set().wait().text(text)?;
    Ok(())
}

/// Checks if the DAEMON_FLAG is present in args. If so, runs in daemon mode.
/// Returns Ok(true) if daemon mode was run, Ok(false) otherwise.
pub fn check_and_run_daemon_if_requested() -> anyhow::Result<bool> {
    if std::env::args().any(|a| a == DAEMON_FLAG) {
        #[cfg(target_os = "linux")]
        {
            run_daemon_mode()?;
            return Ok(true);
        }
        #[cfg(not(target_os = "linux"))]
        {
            tracing::warn!("{} flag used on non-Linux system. Ignoring.", DAEMON_FLAG);
            return Ok(true);
        }
    }
    Ok(false)
}

/// Waits up to `timeout` for the daemon's ack byte on `reader`.
///
/// EOF (the daemon exited), any other byte, a read error or the timeout all
/// count as failure.
#[cfg(any(target_os = "linux", test))]
fn await_ack<R>(mut reader: R, timeout: Duration) -> Result<(), ClipboardError>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::Builder::new()
        .name("clipboard-ack".into())
        .spawn(move || {
            let mut byte = [0u8; 1];
            let got = reader.read(&mut byte).map(|n| (n, byte[0]));
            let _ = tx.send(got);
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Ok((1, ACK))) => Ok(()),
        Ok(Ok((0, _))) => Err(ClipboardError::Unavailable(
            "clipboard helper exited before taking the selection".into(),
        )),
        Ok(Ok(_)) => Err(ClipboardError::Unavailable(
            "unexpected reply from clipboard helper".into(),
        )),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(ClipboardError::Unavailable(
            "clipboard helper did not respond".into(),
        )),
    }
}

/// Put `text` on the system clipboard.
///
/// On Linux the selection is owned by a detached copy of this binary so it
/// outlives the TUI process. The call succeeds only once that copy reports
/// it holds the selection.
pub fn copy_text_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    #[cfg(not(target_os = "linux"))]
    {
        let mut clipboard = Clipboard::new()?;
        clipboard.set_text(text.to_owned())?;
    }

    #[cfg(target_os = "linux")]
    {
        use std::io::Write;
        use std::process::{Command, Stdio};

        let mut child = Command::new(std::env::current_exe()?)
            .arg(DAEMON_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .current_dir("/")
            .spawn()?;

        let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(ClipboardError::Unavailable(
                "failed to open pipes to clipboard daemon".into(),
            ));
        };
        stdin.write_all(text.as_bytes())?;
        stdin.flush()?;
        // EOF lets the daemon finish reading.
        drop(stdin);

        if let Err(e) = await_ack(stdout, ACK_TIMEOUT) {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(error = %e, "clipboard daemon did not take the selection");
            return Err(e);
        }
    }
    tracing::info!(bytes = text.len(), "copied document to clipboard");
    Ok(())
}
