//! Audio playback through a single shared music channel.
//!
//! Like a classic mixer "music" channel there is only one track at a time:
//! playing replaces whatever is currently playing, and concurrent callers
//! can stop each other. Nothing arbitrates between them.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use log::{debug, error, info, warn};
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use thiserror::Error;

use crate::communication::Message;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open the default audio output")]
    OpenStream(#[source] rodio::StreamError),

    #[error("failed to spawn the audio thread")]
    Spawn(#[source] std::io::Error),

    #[error("the audio thread has stopped")]
    Disconnected,
}

/// how many times a loaded track plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loops {
    Once,
    Forever,
}

/// The audio playback capability used by alerts.
pub trait AudioPlayer: Send + Sync {
    /// # Errors
    /// if the player is no longer running
    fn load(&self, path: &Path) -> Result<(), AudioError>;

    /// `volume` is clamped to `0.0..=1.0`
    ///
    /// # Errors
    /// if the player is no longer running
    fn set_volume(&self, volume: f32) -> Result<(), AudioError>;

    /// # Errors
    /// if the player is no longer running
    fn play(&self, loops: Loops) -> Result<(), AudioError>;

    /// # Errors
    /// if the player is no longer running
    fn stop(&self) -> Result<(), AudioError>;
}

/// [`AudioPlayer`] backed by rodio. The output stream lives on its own
/// thread, this handle only sends it [`Message`]s.
#[derive(Debug)]
pub struct RodioPlayer {
    sender: Sender<Message>,
}

impl RodioPlayer {
    /// Opens the default output device on a dedicated thread.
    ///
    /// # Errors
    /// if there is no usable output device or the thread can't be spawned
    pub fn new() -> Result<Self, AudioError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || match OutputStreamBuilder::open_default_stream() {
                Ok(stream) => {
                    // the handle side may already be gone, nothing to report to then
                    let _ = ready_tx.send(Ok(()));
                    run_channel(&stream, &rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(AudioError::OpenStream(e)));
                }
            })
            .map_err(AudioError::Spawn)?;
        ready_rx.recv().map_err(|_| AudioError::Disconnected)??;
        info!("audio output opened");
        Ok(Self { sender: tx })
    }

    fn send(&self, message: Message) -> Result<(), AudioError> {
        self.sender
            .send(message)
            .map_err(|_| AudioError::Disconnected)
    }
}

impl AudioPlayer for RodioPlayer {
    fn load(&self, path: &Path) -> Result<(), AudioError> {
        self.send(Message::Load(path.to_path_buf()))
    }

    fn set_volume(&self, volume: f32) -> Result<(), AudioError> {
        self.send(Message::SetVolume(volume.clamp(0.0, 1.0)))
    }

    fn play(&self, loops: Loops) -> Result<(), AudioError> {
        self.send(Message::Play(loops))
    }

    fn stop(&self) -> Result<(), AudioError> {
        self.send(Message::Stop)
    }
}

/// Plays and says nothing. Stands in for both the audio player and the
/// speech engine when nothing should be heard.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mute;

impl AudioPlayer for Mute {
    fn load(&self, _path: &Path) -> Result<(), AudioError> {
        Ok(())
    }

    fn set_volume(&self, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }

    fn play(&self, _loops: Loops) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// state of the single music channel
struct Channel {
    loaded: Option<PathBuf>,
    volume: f32,
    sink: Option<Sink>,
}

fn run_channel(stream: &rodio::OutputStream, rx: &Receiver<Message>) {
    let mut channel = Channel {
        loaded: None,
        volume: 1.0,
        sink: None,
    };
    // ends once every handle is dropped
    while let Ok(message) = rx.recv() {
        debug!("audio: {message:?}");
        match message {
            Message::Load(path) => {
                if let Some(sink) = channel.sink.take() {
                    sink.stop();
                }
                channel.loaded = Some(path);
            }
            Message::SetVolume(volume) => {
                channel.volume = volume;
                if let Some(sink) = &channel.sink {
                    sink.set_volume(volume);
                }
            }
            Message::Play(loops) => {
                let Some(path) = &channel.loaded else {
                    warn!("play requested with nothing loaded");
                    continue;
                };
                if let Some(sink) = channel.sink.take() {
                    sink.stop();
                }
                match open_sink(stream, path, loops, channel.volume) {
                    Ok(sink) => channel.sink = Some(sink),
                    Err(e) => error!("couldn't play {}: {e}", path.display()),
                }
            }
            Message::Stop => {
                if let Some(sink) = channel.sink.take() {
                    sink.stop();
                }
            }
        }
    }
    debug!("audio thread exiting");
}

fn open_sink(
    stream: &rodio::OutputStream,
    path: &Path,
    loops: Loops,
    volume: f32,
) -> Result<Sink, Box<dyn std::error::Error>> {
    let file = BufReader::new(File::open(path)?);
    let source = Decoder::new(file)?;
    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume);
    match loops {
        Loops::Once => sink.append(source),
        Loops::Forever => sink.append(source.repeat_infinite()),
    }
    sink.play();
    Ok(sink)
}
