use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::alert::domain::warning_sound::{AudioError, WarningSound};

enum Command {
    Play,
    Pause,
    Rewind,
    Volume(f32),
}

/// Looping warning sound played through the default output device.
///
/// The rodio output stream is not `Send`, so it lives on a dedicated audio
/// thread that receives transport commands over a channel. The encoded file
/// is kept in memory and re-decoded from the start after each rewind.
pub struct RodioWarningSound {
    commands: Option<Sender<Command>>,
    playing: bool,
    audio_thread: Option<JoinHandle<()>>,
}

impl RodioWarningSound {
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let bytes: Arc<[u8]> = fs::read(path)
            .map_err(|_| AudioError::AssetMissing(path.to_path_buf()))?
            .into();
        decode(&bytes)?;

        let (tx, rx) = crossbeam_channel::unbounded::<Command>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let audio_thread = std::thread::spawn(move || run_audio_thread(bytes, rx, ready_tx));

        ready_rx
            .recv()
            .map_err(|_| AudioError::Device("audio thread exited during startup".into()))??;

        log::info!("Loaded warning sound {}", path.display());
        Ok(Self {
            commands: Some(tx),
            playing: false,
            audio_thread: Some(audio_thread),
        })
    }

    fn send(&self, command: Command) -> Result<(), AudioError> {
        self.commands
            .as_ref()
            .ok_or_else(|| AudioError::Device("audio thread stopped".into()))?
            .send(command)
            .map_err(|_| AudioError::Device("audio thread stopped".into()))
    }
}

impl WarningSound for RodioWarningSound {
    fn play(&mut self) -> Result<(), AudioError> {
        self.send(Command::Play)?;
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.send(Command::Pause)?;
        self.playing = false;
        Ok(())
    }

    fn reset_position(&mut self) -> Result<(), AudioError> {
        self.send(Command::Rewind)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.send(Command::Volume(volume.clamp(0.0, 1.0)))
    }
}

impl Drop for RodioWarningSound {
    fn drop(&mut self) {
        // Closing the channel ends the audio thread's command loop.
        self.commands = None;
        if let Some(handle) = self.audio_thread.take() {
            if handle.join().is_err() {
                log::warn!("Audio thread panicked");
            }
        }
    }
}

fn decode(bytes: &Arc<[u8]>) -> Result<Decoder<Cursor<Arc<[u8]>>>, AudioError> {
    Decoder::new(Cursor::new(bytes.clone())).map_err(|e| AudioError::Decode(e.to_string()))
}

fn run_audio_thread(
    bytes: Arc<[u8]>,
    commands: Receiver<Command>,
    ready: Sender<Result<(), AudioError>>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(AudioError::Device(e.to_string())));
            return;
        }
    };
    let sink = match Sink::try_new(&handle) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = ready.send(Err(AudioError::Device(e.to_string())));
            return;
        }
    };
    sink.pause();
    let _ = ready.send(Ok(()));

    for command in commands {
        match command {
            Command::Play => {
                if sink.empty() {
                    match decode(&bytes) {
                        Ok(source) => sink.append(source.repeat_infinite()),
                        Err(e) => {
                            log::warn!("{e}");
                            continue;
                        }
                    }
                }
                sink.play();
            }
            Command::Pause => sink.pause(),
            // Dropping the queued source rewinds: the next Play decodes afresh.
            Command::Rewind => sink.clear(),
            Command::Volume(volume) => sink.set_volume(volume),
        }
    }
}
