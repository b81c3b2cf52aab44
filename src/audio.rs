use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use instant::Instant;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::error::{AudioError, ResourceMissing};

/// Named sound effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Plays while the pet is dragged.
    Drag,
    /// Accompanies the special overlay.
    Special,
}

/// Sound request emitted by the pet's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueCommand {
    Play(Cue),
    Stop(Cue, Duration),
}

struct Fade {
    started: Instant,
    duration: Duration,
}

impl Fade {
    fn new(started: Instant, duration: Duration) -> Self {
        Self { started, duration }
    }

    fn gain(&self, now: Instant) -> f32 {
        fade_gain(now.saturating_duration_since(self.started), self.duration)
    }
}

struct Voice {
    sink: Sink,
    fade: Option<Fade>,
}

struct Output {
    // Dropping the stream silences every sink, so it lives as long as we do.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    clips: HashMap<Cue, Arc<[u8]>>,
    voices: HashMap<Cue, Voice>,
}

/// Cue player. Every failure here is logged and swallowed: a missing sound
/// must never stop the pet.
pub struct Audio {
    output: Option<Output>,
}

impl Audio {
    /// Open the default output device and read every cue file up front.
    pub fn new(cues: &[(Cue, PathBuf)]) -> Self {
        let (stream, handle) = match OutputStream::try_default() {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("{}; sound disabled", AudioError::from(e));
                return Self::disabled();
            }
        };

        let mut clips = HashMap::new();
        for (cue, path) in cues {
            match std::fs::read(path) {
                Ok(bytes) => {
                    clips.insert(*cue, Arc::from(bytes));
                }
                Err(source) => {
                    let err = ResourceMissing {
                        what: "sound",
                        path: path.clone(),
                        source,
                    };
                    log::warn!("{err}; {cue:?} cue disabled");
                }
            }
        }
        log::info!("Audio ready, {} of {} cues loaded", clips.len(), cues.len());

        Self {
            output: Some(Output {
                _stream: stream,
                handle,
                clips,
                voices: HashMap::new(),
            }),
        }
    }

    pub fn disabled() -> Self {
        Self { output: None }
    }

    pub fn apply(&mut self, command: CueCommand, now: Instant) {
        match command {
            CueCommand::Play(cue) => self.play(cue),
            CueCommand::Stop(cue, fade) => self.stop(cue, fade, now),
        }
    }

    /// Start `cue` from the beginning.
    pub fn play(&mut self, cue: Cue) {
        self.start(cue, None);
    }

    /// Like `play`, but cut off after `limit`.
    pub fn play_for(&mut self, cue: Cue, limit: Duration) {
        self.start(cue, Some(limit));
    }

    fn start(&mut self, cue: Cue, limit: Option<Duration>) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        if let Err(e) = output.play(cue, limit) {
            log::warn!("Cannot play {cue:?} cue: {e}");
        }
    }

    /// Fade `cue` out over `fade`, starting at `now`; a zero fade stops it immediately.
    pub fn stop(&mut self, cue: Cue, fade: Duration, now: Instant) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        let Some(voice) = output.voices.get_mut(&cue) else {
            return;
        };
        if fade.is_zero() {
            voice.sink.stop();
            output.voices.remove(&cue);
        } else {
            voice.fade = Some(Fade::new(now, fade));
        }
    }

    pub fn stop_all(&mut self) {
        if let Some(output) = self.output.as_mut() {
            for (_, voice) in output.voices.drain() {
                voice.sink.stop();
            }
        }
    }

    /// Advance fades and forget finished voices. Call from the tick loop.
    pub fn update(&mut self, now: Instant) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        output.voices.retain(|_, voice| {
            if let Some(fade) = &voice.fade {
                let gain = fade.gain(now);
                if gain <= 0.0 {
                    voice.sink.stop();
                    return false;
                }
                voice.sink.set_volume(gain);
            }
            !voice.sink.empty()
        });
    }
}

impl Output {
    fn play(&mut self, cue: Cue, limit: Option<Duration>) -> Result<(), AudioError> {
        let Some(clip) = self.clips.get(&cue) else {
            return Ok(());
        };
        if let Some(old) = self.voices.remove(&cue) {
            old.sink.stop();
        }

        let sink = Sink::try_new(&self.handle)?;
        let source = Decoder::new(Cursor::new(Arc::clone(clip)))?;
        match limit {
            Some(limit) => sink.append(source.take_duration(limit)),
            None => sink.append(source),
        }
        self.voices.insert(cue, Voice { sink, fade: None });
        Ok(())
    }
}

/// Linear fade from 1 to 0 over `duration`.
fn fade_gain(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 0.0;
    }
    (1.0 - elapsed.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_is_linear_and_ends_silent() {
        let d = Duration::from_millis(200);
        assert_eq!(fade_gain(Duration::ZERO, d), 1.0);
        assert!((fade_gain(Duration::from_millis(50), d) - 0.75).abs() < 1e-6);
        assert_eq!(fade_gain(Duration::from_millis(200), d), 0.0);
        assert_eq!(fade_gain(Duration::from_secs(9), d), 0.0);
        assert_eq!(fade_gain(Duration::ZERO, Duration::ZERO), 0.0);
    }

    #[test]
    fn fade_is_measured_from_the_given_clock() {
        let t0 = Instant::now();
        let fade = Fade::new(t0, Duration::from_millis(200));
        assert_eq!(fade.gain(t0), 1.0);
        assert!((fade.gain(t0 + Duration::from_millis(50)) - 0.75).abs() < 1e-6);
        assert_eq!(fade.gain(t0 + Duration::from_millis(200)), 0.0);
    }

    #[test]
    fn disabled_audio_ignores_everything() {
        let mut audio = Audio::disabled();
        let now = Instant::now();
        audio.apply(CueCommand::Play(Cue::Drag), now);
        audio.apply(CueCommand::Stop(Cue::Drag, Duration::from_millis(1)), now);
        audio.play_for(Cue::Special, Duration::from_secs(10));
        audio.update(now);
        audio.stop_all();
    }
}
