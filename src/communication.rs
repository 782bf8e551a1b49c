use std::path::PathBuf;

use crate::audio::Loops;

/// requests sent to the thread that owns the audio output
#[derive(Debug, Clone)]
pub enum Message {
    Load(PathBuf),
    SetVolume(f32),
    Play(Loops),
    Stop,
}
