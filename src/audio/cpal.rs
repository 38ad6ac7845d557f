// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{fmt, sync::mpsc, thread, time::Duration};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info, span, Level};

use crate::audio::{playable_range, Device as AudioDevice, PlaybackError, SampleFormat, TargetFormat};

/// The unsigned 8-bit equilibrium level, played once the buffer runs out.
const U8_SILENCE: u8 = 0x80;

/// How long a stream stays open after its buffer should have finished playing.
const STREAM_TAIL: Duration = Duration::from_millis(200);

/// A small wrapper around a cpal::Device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.host_id.name())
    }
}

fn unavailable<E: fmt::Display>(err: E) -> PlaybackError {
    PlaybackError::Unavailable(err.to_string())
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, PlaybackError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices that can output audio.
    fn list_cpal_devices() -> Result<Vec<Device>, PlaybackError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout().map_err(unavailable)?;
        let _shh_stderr = shh::stderr().map_err(unavailable)?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(e) => {
                    debug!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Host unavailable"
                    );
                    continue;
                }
            };
            let host_devices = match host.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let has_output = match device.supported_output_configs() {
                    Ok(mut output_configs) => output_configs.any(|config| config.channels() > 0),
                    Err(_) => false,
                };
                if !has_output {
                    continue;
                }

                match device.name() {
                    Ok(name) => devices.push(Device {
                        name,
                        host_id,
                        device,
                    }),
                    Err(e) => debug!(err = e.to_string(), "Skipping unnamed device"),
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device. "default" picks the default host's default output.
    pub fn get(name: &str) -> Result<Device, PlaybackError> {
        if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| unavailable("no default output device"))?;
            return Ok(Device {
                name: device.name().map_err(unavailable)?,
                host_id: host.id(),
                device,
            });
        }

        Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
            .ok_or_else(|| unavailable(format!("no device found with name {}", name)))
    }
}

impl AudioDevice for Device {
    /// Opens a stream on its own thread, feeds the buffer through it once and closes it after
    /// the buffer's duration. Returns once the stream has started.
    fn play(
        &self,
        format: &TargetFormat,
        buffer: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<(), PlaybackError> {
        let span = span!(Level::INFO, "play preview (cpal)");
        let _enter = span.enter();

        if format.sample_format != SampleFormat::UnsignedInt || format.bits_per_sample != 8 {
            return Err(PlaybackError::Stream(format!(
                "cannot play {}-bit {} audio",
                format.bits_per_sample, format.sample_format
            )));
        }

        let data = playable_range(buffer, offset, len)?.to_vec();
        let duration = Duration::from_secs_f64(
            data.len() as f64 / (format.sample_rate as f64 * format.channels as f64),
        );
        info!(
            device = self.name,
            bytes = data.len(),
            duration = format!("{:?}", duration),
            "Playing preview."
        );

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: format.sample_rate as cpal::SampleRate,
            buffer_size: cpal::BufferSize::Default,
        };
        let device = self.device.clone();
        let (started_tx, started_rx) = mpsc::channel::<Result<(), String>>();

        // The stream is created inside the thread and lives until the buffer is done.
        thread::spawn(move || {
            let mut position = 0;
            let stream_result = device.build_output_stream(
                &config,
                move |out: &mut [u8], _: &cpal::OutputCallbackInfo| {
                    let remaining = &data[position..];
                    let count = remaining.len().min(out.len());
                    out[..count].copy_from_slice(&remaining[..count]);
                    out[count..].fill(U8_SILENCE);
                    position += count;
                },
                |err| error!("CPAL output stream error: {}", err),
                None,
            );

            let stream = match stream_result {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = started_tx.send(Err(format!("failed to create stream: {}", e)));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = started_tx.send(Err(format!("failed to start stream: {}", e)));
                return;
            }
            let _ = started_tx.send(Ok(()));

            thread::sleep(duration + STREAM_TAIL);
            drop(stream);
            debug!("Preview stream closed");
        });

        match started_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PlaybackError::Unavailable(e)),
            Err(_) => Err(unavailable("output thread exited before the stream started")),
        }
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<std::sync::Arc<super::mock::Device>, PlaybackError> {
        Err(PlaybackError::Stream("not a mock device".to_string()))
    }
}
