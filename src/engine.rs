/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    io::{self, BufRead, BufReader, Read, Write},
    mem,
    process::{Child, ChildStdin, Command, Stdio},
    sync::mpsc::Sender,
    thread,
    time::Duration,
};

use log::{debug, error, info, warn};

use crate::EngineConfig;

/// Shown when the engine process could not be started.
pub const SPAWN_FAILED_ALERT: &str =
    "Couldn't spawn process - check the paths in the config file, and use absolute paths.";

/// Shown the first time a write to a previously working engine fails.
pub const CRASH_ALERT: &str = "The engine appears to have crashed.";

/// Something that happened on one of the engine's output streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A line from the engine's stdout.
    Stdout(String),

    /// A line from the engine's stderr.
    Stderr(String),

    /// The engine's stdout was closed.
    Exited,
}

/// Receives engine output that made it through the readiness gate.
pub trait EngineListener {
    /// Called with each stdout line that is not being ignored.
    fn on_line(&mut self, line: &str);

    /// Called with every stderr line.
    fn on_error_line(&mut self, line: &str);
}

/// A conversation with a UCI engine running as a subprocess.
///
/// Output is read on background threads and delivered as [`EngineEvent`]s through a channel.
/// The owner of the receiving end feeds those back in through [`EngineSession::receive_line`] and
/// [`EngineSession::receive_error_line`], which is where stale output is filtered.
///
/// Every [`EngineSession::sync`] sends `isready`, and everything on stdout is discarded until the matching `readyok` arrives.
pub struct EngineSession<W: Write = ChildStdin> {
    /// Where commands are written. `None` if the engine was never started.
    stdin: Option<W>,

    child: Option<Child>,

    /// Number of `readyok`s still owed by the engine.
    readyok_required: usize,

    /// Whether any command has ever been written successfully.
    ever_sent: bool,

    /// Whether the crash alert has been raised.
    warned: bool,

    /// User-facing messages waiting to be displayed.
    alerts: Vec<String>,

    /// Whether `info` lines should be logged.
    log_info_lines: bool,
}

impl EngineSession<ChildStdin> {
    /// Starts the engine described by `config`, sending its output through `sender`.
    ///
    /// The process runs in the directory containing its executable.
    /// If it cannot be started, the returned session is dead and holds an alert saying so.
    pub fn spawn<E>(config: &EngineConfig, log_info_lines: bool, sender: Sender<E>) -> Self
    where
        E: From<EngineEvent> + Send + 'static,
    {
        let mut session = Self::dead(log_info_lines);

        let path = config
            .path
            .canonicalize()
            .unwrap_or_else(|_| config.path.clone());

        let mut command = Command::new(&path);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!("Failed to spawn {path:?}: {err}");
                session.alert(SPAWN_FAILED_ALERT);
                return session;
            }
        };
        info!("Spawned {path:?} with pid {}", child.id());

        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, sender.clone(), EngineEvent::Stdout, true);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, sender, EngineEvent::Stderr, false);
        }

        session.stdin = child.stdin.take();
        session.child = Some(child);
        session
    }

    /// Asks the engine to quit, then makes sure it does.
    pub fn shutdown(&mut self) {
        self.send("quit");

        // Closing stdin is enough for most engines to exit on their own
        self.stdin = None;

        let Some(mut child) = self.child.take() else {
            return;
        };

        for _ in 0..20 {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!("Engine exited with {status}");
                    return;
                }
                Ok(None) => thread::sleep(Duration::from_millis(25)),
                Err(err) => {
                    warn!("Failed to poll engine process: {err}");
                    break;
                }
            }
        }

        if let Err(err) = child.kill() {
            warn!("Failed to kill engine process: {err}");
        }
        match child.wait() {
            Ok(status) => info!("Engine killed ({status})"),
            Err(err) => warn!("Failed to reap engine process: {err}"),
        }
    }

    /// Records that the engine's stdout has closed, reaping the process if it has exited.
    ///
    /// The session is left as is, so the next failed write raises the crash alert.
    pub fn handle_exit(&mut self) {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(Some(status))) => info!("Engine exited with {status}"),
            Some(Ok(None)) => info!("Engine closed its output"),
            Some(Err(err)) => warn!("Failed to poll engine process: {err}"),
            None => {}
        }
    }
}

impl<W: Write> EngineSession<W> {
    /// A session that ignores everything sent to it.
    pub fn dead(log_info_lines: bool) -> Self {
        Self {
            stdin: None,
            child: None,
            readyok_required: 0,
            ever_sent: false,
            warned: false,
            alerts: Vec::new(),
            log_info_lines,
        }
    }

    /// A session that writes its commands to `writer` instead of a process.
    pub fn with_writer(writer: W, log_info_lines: bool) -> Self {
        Self {
            stdin: Some(writer),
            ..Self::dead(log_info_lines)
        }
    }

    /// Returns `true` if there is something to write commands to.
    pub fn is_alive(&self) -> bool {
        self.stdin.is_some()
    }

    /// The writer commands are sent to, if any.
    pub fn writer(&self) -> Option<&W> {
        self.stdin.as_ref()
    }

    /// Number of `isready`s that have not been answered yet.
    pub fn pending_syncs(&self) -> usize {
        self.readyok_required
    }

    /// Removes and returns all pending user-facing alerts.
    pub fn take_alerts(&mut self) -> Vec<String> {
        mem::take(&mut self.alerts)
    }

    fn alert(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!("{msg}");
        self.alerts.push(msg);
    }

    /// Writes `command` to the engine, followed by a newline.
    ///
    /// Does nothing if the engine was never started.
    pub fn send(&mut self, command: &str) {
        let Some(stdin) = self.stdin.as_mut() else {
            return;
        };

        let msg = command.trim();
        match writeln!(stdin, "{msg}").and_then(|_| stdin.flush()) {
            Ok(()) => {
                debug!("--> {msg}");
                self.ever_sent = true;
            }
            Err(err) => {
                debug!("(failed) --> {msg} ({err})");
                if self.ever_sent && !self.warned {
                    self.warned = true;
                    self.alert(CRASH_ALERT);
                }
            }
        }
    }

    /// Sends `setoption name <name> value <value>`.
    pub fn set_option(&mut self, name: &str, value: impl fmt::Display) {
        self.send(&format!("setoption name {name} value {value}"));
    }

    /// Sends `isready`. All stdout lines are ignored until the engine answers with `readyok`.
    pub fn sync(&mut self) {
        self.send("isready");
        self.readyok_required += 1;
    }

    /// Handles one line of the engine's stdout, passing it to `listener` unless a sync is pending.
    pub fn receive_line(&mut self, line: &str, listener: &mut impl EngineListener) {
        if line.contains("readyok") && self.readyok_required > 0 {
            self.readyok_required -= 1;
        }

        let loggable = self.log_info_lines || !line.contains("info");

        if self.readyok_required > 0 {
            if loggable {
                debug!("(ignored) < {line}");
            }
            return;
        }

        if loggable {
            debug!("< {line}");
        }
        listener.on_line(line);
    }

    /// Handles one line of the engine's stderr, which is always passed to `listener`.
    pub fn receive_error_line(&mut self, line: &str, listener: &mut impl EngineListener) {
        debug!("! {line}");
        listener.on_error_line(line);
    }
}

impl<W: Write> fmt::Debug for EngineSession<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("alive", &self.is_alive())
            .field("pid", &self.child.as_ref().map(Child::id))
            .field("readyok_required", &self.readyok_required)
            .field("ever_sent", &self.ever_sent)
            .field("warned", &self.warned)
            .finish()
    }
}

/// Reads `stream` line by line on a new thread, sending each line through `sender`.
///
/// If `report_exit` is set, [`EngineEvent::Exited`] is sent once the stream closes.
fn spawn_reader<R, E>(
    stream: R,
    sender: Sender<E>,
    wrap: fn(String) -> EngineEvent,
    report_exit: bool,
) where
    R: Read + Send + 'static,
    E: From<EngineEvent> + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buffer = Vec::with_capacity(1024);

        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buffer);
                    let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
                    if sender.send(wrap(line.to_string()).into()).is_err() {
                        return;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    debug!("Engine stream closed: {err}");
                    break;
                }
            }
        }

        if report_exit {
            // The receiver may already be gone if the front end is shutting down
            sender.send(EngineEvent::Exited.into()).ok();
        }
    });
}
