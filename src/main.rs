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
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{crate_version, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nibblekit::audio::{self, sample_source::SymphoniaDecoder};
use nibblekit::config::{Audio, ConvertProfile};
use nibblekit::convert::{self, PackedInfo};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Converts audio into packed Game Boy wave samples."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converts audio files into packed samples.
    Convert {
        /// The audio files to convert.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// The directory to write packed samples to.
        #[arg(short, long)]
        out_dir: PathBuf,
        /// The conversion profile to use.
        #[arg(short, long)]
        profile: Option<PathBuf>,
        /// Decode at half the chip rate.
        #[arg(long)]
        half_speed: bool,
        /// Don't dither while processing.
        #[arg(long)]
        no_dither: bool,
        /// Volume adjustment in dB.
        #[arg(short, long, allow_hyphen_values = true)]
        volume_db: Option<i32>,
        /// Fixed seed for the dither generator.
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Prints the size of a packed sample.
    Info {
        /// The packed sample.
        packed: PathBuf,
    },
    /// Writes a packed sample out as a WAV file.
    Unpack {
        /// The packed sample.
        packed: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
    },
    /// Plays a packed sample the way the wave channel would.
    Preview {
        /// The packed sample.
        packed: PathBuf,
        /// The device name to play through.
        #[arg(short, long)]
        device: Option<String>,
        /// The profile to take the device from.
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Manages conversion profiles.
    Profile {
        #[clap(subcommand)]
        command: ProfileCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Writes a profile with the default settings.
    Init {
        /// Where to write the profile.
        path: PathBuf,
    },
}

fn load_profile(path: Option<&Path>) -> Result<ConvertProfile, Box<dyn Error>> {
    Ok(match path {
        Some(path) => ConvertProfile::deserialize(path)?,
        None => ConvertProfile::default(),
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            inputs,
            out_dir,
            profile,
            half_speed,
            no_dither,
            volume_db,
            seed,
        } => {
            let overrides = ConvertProfile::default()
                .set_half_speed(half_speed.then_some(true))
                .set_dither(no_dither.then_some(false))
                .set_volume_db(volume_db)
                .set_seed(seed);
            let profile = load_profile(profile.as_deref())?.merge(&overrides);

            fs::create_dir_all(&out_dir)?;
            let results = convert::convert_all(&inputs, &out_dir, &profile, &SymphoniaDecoder);

            let mut failed = 0;
            for (input, result) in inputs.iter().zip(results) {
                match result {
                    Ok(output) => println!("{} -> {}", input.display(), output.display()),
                    Err(e) => {
                        println!("{}: {}", input.display(), e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{} of {} files failed to convert", failed, inputs.len()).into());
            }
        }
        Commands::Info { packed } => {
            let info = PackedInfo::new(&fs::read(&packed)?, false);
            println!("{}:", packed.display());
            println!("- bytes: {}", info.bytes);
            println!("- samples: {}", info.samples);
            println!("- frames: {}", info.frames);
            println!("- duration: {:?}", info.duration);
        }
        Commands::Unpack { packed, output } => {
            convert::unpack_to_wav(&fs::read(&packed)?, &output)?;
            println!("{} -> {}", packed.display(), output.display());
        }
        Commands::Preview {
            packed,
            device,
            profile,
        } => {
            let audio_config = match device {
                Some(device) => Audio::new(&device),
                None => load_profile(profile.as_deref())?.audio(),
            };
            let device = audio::get_device(&audio_config)?;
            let duration = convert::preview(&fs::read(&packed)?, device.as_ref())?;

            // Playback runs on the device's own thread.
            thread::sleep(duration);
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Profile {
            command: ProfileCommands::Init { path },
        } => {
            ConvertProfile::with_defaults().save(&path)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
