use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

use crate::debug;

/// Anything that can start and stop the video of one reel.
///
/// Both operations may fail; callers treat failures as a refusal and keep
/// going.
pub trait VideoBackend {
    fn play(&mut self, index: usize, source: &str) -> Result<()>;
    fn pause(&mut self, index: usize) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Paused,
    Playing,
}

/// Play state of every video region, kept in step with a backend.
pub struct Deck {
    states: Vec<PlayState>,
    backend: Box<dyn VideoBackend>,
}

impl Deck {
    pub fn new(len: usize, backend: Box<dyn VideoBackend>) -> Self {
        Self {
            states: vec![PlayState::Paused; len],
            backend,
        }
    }

    pub fn state(&self, index: usize) -> Option<PlayState> {
        self.states.get(index).copied()
    }

    pub fn playing(&self) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == PlayState::Playing)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn pause_all(&mut self) {
        for index in 0..self.states.len() {
            if let Err(err) = self.backend.pause(index) {
                debug::log(format!("pause reel {index} failed: {err:#}"));
            }
            self.states[index] = PlayState::Paused;
        }
    }

    /// Starts one region. A refusal leaves the region paused and is not
    /// reported beyond the debug log.
    pub fn play(&mut self, index: usize, source: &str) {
        if index >= self.states.len() {
            return;
        }
        match self.backend.play(index, source) {
            Ok(()) => self.states[index] = PlayState::Playing,
            Err(err) => debug::log(format!("play reel {index} refused: {err:#}")),
        }
    }
}

/// Tracks play state only; used when no external player is configured.
#[derive(Default)]
pub struct SilentBackend;

impl VideoBackend for SilentBackend {
    fn play(&mut self, _index: usize, _source: &str) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self, _index: usize) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Play(usize),
    Pause(usize),
}

/// Records every call and optionally refuses to play.
#[derive(Clone, Default)]
pub struct MockBackend {
    pub calls: Arc<Mutex<Vec<BackendCall>>>,
    pub refuse_play: bool,
}

impl MockBackend {
    pub fn refusing() -> Self {
        Self {
            refuse_play: true,
            ..Self::default()
        }
    }

    pub fn plays(&self) -> Vec<usize> {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| match call {
                        BackendCall::Play(index) => Some(*index),
                        BackendCall::Pause(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl VideoBackend for MockBackend {
    fn play(&mut self, index: usize, _source: &str) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(BackendCall::Play(index));
        }
        if self.refuse_play {
            return Err(anyhow!("autoplay refused"));
        }
        Ok(())
    }

    fn pause(&mut self, index: usize) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(BackendCall::Pause(index));
        }
        Ok(())
    }
}

pub const URL_PLACEHOLDER: &str = "%URL%";

/// Runs an external player (mpv by default) for the reel that is playing.
pub struct MpvBackend {
    command: Vec<String>,
    session: Option<(usize, PlayerSession)>,
}

impl MpvBackend {
    pub fn new(command: Vec<String>) -> Result<Self> {
        anyhow::ensure!(!command.is_empty(), "player command is empty");
        Ok(Self {
            command,
            session: None,
        })
    }

    fn stop(&mut self) {
        if let Some((index, session)) = self.session.take() {
            if let Some(Ok(status)) = session.stop_blocking() {
                debug::log(format!("player for reel {index} stopped with {:?}", status.code()));
            }
        }
    }
}

impl VideoBackend for MpvBackend {
    fn play(&mut self, index: usize, source: &str) -> Result<()> {
        if source.trim().is_empty() {
            return Err(anyhow!("video source missing"));
        }
        self.stop();
        let args = player_args(&self.command, source);
        let session = PlayerSession::spawn(args)?;
        self.session = Some((index, session));
        Ok(())
    }

    fn pause(&mut self, index: usize) -> Result<()> {
        let Some((active, session)) = self.session.as_mut() else {
            return Ok(());
        };
        if *active != index {
            return Ok(());
        }
        if let Some(Err(err)) = session.try_status() {
            self.session = None;
            return Err(err);
        }
        self.stop();
        Ok(())
    }
}

impl Drop for MpvBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn player_args(command: &[String], source: &str) -> Vec<String> {
    let mut args: Vec<String> = command
        .iter()
        .map(|arg| arg.replace(URL_PLACEHOLDER, source))
        .collect();
    if !command.iter().any(|arg| arg.contains(URL_PLACEHOLDER)) {
        args.push(source.to_string());
    }
    args
}

/// A supervised player process. The child is owned by a helper thread that
/// kills it on request and reports the exit status back.
struct PlayerSession {
    kill_tx: Sender<()>,
    status_rx: Receiver<Result<ExitStatus>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PlayerSession {
    fn spawn(args: Vec<String>) -> Result<Self> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| anyhow!("player command is empty"))?;
        let mut command = Command::new(program);
        command
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        debug::log(format!("spawning player: {:?}", args));
        let mut child = command
            .spawn()
            .with_context(|| format!("launch {program}"))?;

        let (kill_tx, kill_rx) = bounded::<()>(1);
        let (status_tx, status_rx) = bounded::<Result<ExitStatus>>(1);
        let handle = thread::spawn(move || {
            let result = loop {
                if kill_rx.try_recv().is_ok() {
                    let _ = child.kill();
                    break child.wait().context("wait for player after stop request");
                }
                match child.try_wait() {
                    Ok(Some(status)) => break Ok(status),
                    Ok(None) => thread::sleep(Duration::from_millis(30)),
                    Err(err) => break Err(anyhow!(err).context("poll player status")),
                }
            };
            let _ = status_tx.send(result);
        });

        Ok(Self {
            kill_tx,
            status_rx,
            handle: Some(handle),
        })
    }

    fn finalize(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn try_status(&mut self) -> Option<Result<ExitStatus>> {
        match self.status_rx.try_recv() {
            Ok(res) => {
                self.finalize();
                Some(res)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finalize();
                Some(Err(anyhow!("player session closed unexpectedly")))
            }
        }
    }

    fn stop_blocking(mut self) -> Option<Result<ExitStatus>> {
        let _ = self.kill_tx.send(());
        let res = self.status_rx.recv().ok();
        self.finalize();
        res
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.kill_tx.send(());
            let _ = self.status_rx.recv().ok();
            self.finalize();
        }
    }
}
