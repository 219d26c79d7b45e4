// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audio recording state machine.
//
//   Idle --start--> Recording --stop--> Finalizing --> Idle
//
// The recorder writes into a single artifact in the cache directory. That
// file never outlives a stop: it is read into memory on success and removed
// in every case.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use portico_bridge::traits::NativeAudioRecorder;
use portico_core::error::{PorticoError, Result};
use portico_core::types::{CapabilityKind, CapabilityOutcome, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Finalizing,
}

/// Removes the artifact when dropped.
struct ArtifactGuard<'a>(&'a Path);

impl Drop for ArtifactGuard<'_> {
    fn drop(&mut self) {
        remove_artifact(self.0);
    }
}

/// Delete `path`; a missing file is fine.
fn remove_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "recording artifact removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove recording artifact"),
    }
}

pub struct AudioSession {
    artifact: PathBuf,
    state: RecordingState,
}

impl AudioSession {
    /// Idle session recording into `artifact`.
    pub fn new(artifact: impl Into<PathBuf>) -> Self {
        Self {
            artifact: artifact.into(),
            state: RecordingState::Idle,
        }
    }

    /// Current recorder state.
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Where the recorder writes; deleted after every stop.
    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    /// Begin recording into a fresh artifact.
    #[instrument(skip_all, fields(path = %self.artifact.display()))]
    pub fn start<R: NativeAudioRecorder + ?Sized>(&mut self, recorder: &R) -> Result<()> {
        if self.state != RecordingState::Idle {
            return Err(PorticoError::Busy(CapabilityKind::AudioRecordStart));
        }

        // A leftover from a crashed session must never be delivered.
        remove_artifact(&self.artifact);
        if let Some(parent) = self.artifact.parent() {
            fs::create_dir_all(parent)?;
        }

        match recorder.start_recording(&self.artifact) {
            Ok(()) => {
                self.state = RecordingState::Recording;
                info!("recording started");
                Ok(())
            }
            Err(e) => {
                remove_artifact(&self.artifact);
                self.state = RecordingState::Idle;
                warn!(error = %e, "recorder failed to start");
                Err(e)
            }
        }
    }

    /// Finish the recording. Returns `None` when nothing was recording; that
    /// stop is a no-op and must not reach script code.
    #[instrument(skip_all, fields(path = %self.artifact.display()))]
    pub fn stop<R: NativeAudioRecorder + ?Sized>(&mut self, recorder: &R) -> Option<CapabilityOutcome> {
        if self.state != RecordingState::Recording {
            debug!(state = ?self.state, "stop ignored; not recording");
            return None;
        }

        self.state = RecordingState::Finalizing;
        let outcome = {
            let _guard = ArtifactGuard(&self.artifact);
            match recorder.stop_recording() {
                Ok(()) => match fs::read(&self.artifact) {
                    Ok(bytes) => {
                        info!(audio_len = bytes.len(), "recording finalized");
                        CapabilityOutcome::Success(Payload::Audio(bytes))
                    }
                    Err(e) => CapabilityOutcome::from(PorticoError::Io(e)),
                },
                Err(e) => {
                    warn!(error = %e, "recorder failed to stop");
                    CapabilityOutcome::from(e)
                }
            }
        };
        self.state = RecordingState::Idle;
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;

    fn session(dir: &tempfile::TempDir) -> AudioSession {
        AudioSession::new(dir.path().join("cache").join("audio_record.3gp"))
    }

    #[test]
    fn successful_recording_is_read_and_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = FakePlatform::new();
        let mut audio = session(&dir);

        audio.start(&fake).expect("start");
        assert_eq!(audio.state(), RecordingState::Recording);
        let outcome = audio.stop(&fake).expect("outcome");

        assert_eq!(
            outcome,
            CapabilityOutcome::Success(Payload::Audio(FakePlatform::AUDIO_BYTES.to_vec()))
        );
        assert!(!audio.artifact_path().exists());
        assert_eq!(audio.state(), RecordingState::Idle);
    }

    #[test]
    fn too_short_recording_reports_error_and_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = FakePlatform::new();
        fake.configure(|s| s.recording_too_short = true);
        let mut audio = session(&dir);

        audio.start(&fake).expect("start");
        assert!(audio.artifact_path().exists());
        let outcome = audio.stop(&fake).expect("outcome");

        assert_eq!(
            outcome,
            CapabilityOutcome::NativeError("recording too short".into())
        );
        assert!(!audio.artifact_path().exists());
    }

    #[test]
    fn stop_while_idle_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = FakePlatform::new();
        let mut audio = session(&dir);
        assert!(audio.stop(&fake).is_none());
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn stale_artifact_is_removed_before_start() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = FakePlatform::new();
        fake.configure(|s| s.recorder_writes = false);
        let mut audio = session(&dir);
        fs::create_dir_all(dir.path().join("cache")).expect("mkdir");
        fs::write(audio.artifact_path(), b"stale").expect("write");

        audio.start(&fake).expect("start");
        assert!(!audio.artifact_path().exists());
    }

    #[test]
    fn failed_start_returns_to_idle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = FakePlatform::new();
        fake.configure(|s| s.recorder_fails = true);
        let mut audio = session(&dir);

        assert!(audio.start(&fake).is_err());
        assert_eq!(audio.state(), RecordingState::Idle);
        assert!(audio.stop(&fake).is_none());
    }

    #[test]
    fn second_start_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = FakePlatform::new();
        let mut audio = session(&dir);
        audio.start(&fake).expect("start");
        assert!(matches!(
            audio.start(&fake),
            Err(PorticoError::Busy(CapabilityKind::AudioRecordStart))
        ));
        assert_eq!(audio.state(), RecordingState::Recording);
    }
}
