//! Real-time microphone capture
//!
//! `CaptureStream` owns a cpal input stream on a dedicated thread (the
//! stream type is not `Send`) and delivers raw i16 buffers to a caller
//! callback on cpal's real-time thread. The callback must not block: no
//! I/O, no unbounded work. Process the buffer and return.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use std::thread::JoinHandle;
use tracing::{error, info, warn};

use super::device::find_input_device;
use crate::errors::RecorderError;

/// Negotiated stream parameters.
///
/// The device's native sample rate wins over whatever was requested and is
/// authoritative for the rest of the session.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A running capture stream.
///
/// Dropping (or calling [`CaptureStream::close`]) stops the stream and joins
/// the owning thread; no further buffers are delivered afterwards.
pub struct CaptureStream {
    info: StreamInfo,
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureStream {
    /// Query the parameters a device would negotiate, without opening a
    /// stream.
    pub fn probe(
        device_selector: Option<&str>,
        channels: u16,
    ) -> Result<StreamInfo, RecorderError> {
        let device = find_input_device(device_selector)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let supported = device.default_input_config().map_err(|e| {
            RecorderError::Device(format!("no supported input config for {device_name}: {e}"))
        })?;
        Ok(StreamInfo {
            device_name,
            sample_rate: supported.sample_rate().0,
            channels,
        })
    }

    /// Open the selected input device and start delivering buffers.
    ///
    /// `on_buffer` is invoked on the capture thread with interleaved i16
    /// samples for every buffer the device delivers. Device buffers arrive
    /// in the device's native sample format and are converted to i16 here.
    pub fn open<F>(
        device_selector: Option<&str>,
        channels: u16,
        on_buffer: F,
    ) -> Result<Self, RecorderError>
    where
        F: FnMut(Vec<i16>) + Send + 'static,
    {
        let device = find_input_device(device_selector)?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string());

        let supported = device.default_input_config().map_err(|e| {
            RecorderError::Device(format!("no supported input config for {device_name}: {e}"))
        })?;

        let info = StreamInfo {
            device_name: device_name.clone(),
            sample_rate: supported.sample_rate().0,
            channels,
        };

        let config = StreamConfig {
            channels,
            sample_rate: supported.sample_rate(),
            buffer_size: BufferSize::Default,
        };
        let sample_format = supported.sample_format();

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), RecorderError>>(1);

        // The cpal stream lives on its own thread; control flows over
        // channels. The build result is reported back before open() returns
        // so device failures surface to the caller.
        let thread = std::thread::spawn(move || {
            let stream = match sample_format {
                SampleFormat::I16 => build_input::<i16, F>(&device, &config, on_buffer),
                SampleFormat::U16 => build_input::<u16, F>(&device, &config, on_buffer),
                _ => build_input::<f32, F>(&device, &config, on_buffer),
            };

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(RecorderError::Device(format!(
                    "failed to start input stream: {e}"
                ))));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            // Park until the session asks us to stop (or the handle is
            // dropped). The stream keeps calling back meanwhile.
            let _ = shutdown_rx.recv();
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(RecorderError::Device(
                    "capture thread exited before the stream started".into(),
                ));
            }
        }

        info!(
            "Capture stream open: {} ({} Hz, {} channel(s))",
            info.device_name, info.sample_rate, info.channels
        );

        Ok(Self {
            info,
            shutdown: shutdown_tx,
            thread: Some(thread),
        })
    }

    /// Negotiated device name, sample rate, and channel count.
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Stop the stream and join the capture thread.
    pub fn close(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.shutdown.send(());
            if thread.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        }
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

fn build_input<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut on_buffer: F,
) -> Result<cpal::Stream, RecorderError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
    F: FnMut(Vec<i16>) + Send + 'static,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data
                    .iter()
                    .map(|&sample| {
                        let sample_f32: f32 = cpal::Sample::from_sample(sample);
                        (sample_f32 * i16::MAX as f32) as i16
                    })
                    .collect();
                on_buffer(samples);
            },
            move |err| {
                // Device disappearance surfaces here; the stream is dead and
                // no further buffers will arrive for this session.
                error!("Audio stream error, end of stream: {err}");
            },
            None,
        )
        .map_err(|e| RecorderError::Device(format!("failed to build input stream: {e}")))
}
