use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hexplay::HexViewBuilder;

use wfrac::{
    codecs::{create_codec, CodecType},
    envelope::{now_timestamp, Command, DeviceConfig},
    wfrac::{decode_status_frame_with, generate_frame, AirconStat, ClimateState, Mode, PowerBitLocation},
};

#[derive(Parser)]
#[command(about = "Encode and decode Mitsubishi WF-RAC airconStat payloads")]
struct Opt {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the airconStat payload for a desired state
    Encode {
        #[command(flatten)]
        state: StateArgs,
    },

    /// Decode status payloads, from the argument or one per line on stdin
    Decode {
        #[arg(long, default_value = "base64")]
        codec: CodecType,

        /// Where to read the power bit from
        #[arg(long, default_value = "computed")]
        location: PowerBitLocation,

        /// Also print a hex view of each frame
        #[arg(long)]
        dump: bool,

        payload: Option<String>,
    },

    /// Check a generated airconStat payload and print the state it carries
    Verify { payload: String },

    /// Print the request to send for a device
    Envelope {
        /// JSON file with host, deviceId, operatorId and airconId
        #[arg(long)]
        config: PathBuf,

        #[command(subcommand)]
        request: Request,
    },
}

#[derive(Subcommand)]
enum Request {
    Get,
    Set {
        #[command(flatten)]
        state: StateArgs,
    },
}

#[derive(clap::Args)]
struct StateArgs {
    /// on or off
    #[arg(long, value_parser = parse_power, action = clap::ArgAction::Set)]
    power: bool,

    #[arg(long, default_value_t = 22.0)]
    temperature: f32,

    /// cool, heat, dry, fan or auto; anything else is treated as cool
    #[arg(long, default_value = "cool")]
    mode: String,
}

impl StateArgs {
    fn mode(&self) -> Mode {
        Mode::from_name_or_cool(&self.mode)
    }
}

fn parse_power(s: &str) -> Result<bool, String> {
    match s {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(format!("expected on or off, got {s:?}")),
    }
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(default_log_level())
        .parse_default_env()
        .init();

    match opt.command {
        Cmd::Encode { state } => {
            println!("{}", generate_frame(state.power, state.temperature, state.mode())?);
        }
        Cmd::Decode {
            codec,
            location,
            dump,
            payload,
        } => decode(codec, location, dump, payload)?,
        Cmd::Verify { payload } => {
            let stat = AirconStat::parse(&payload)?;
            let state = ClimateState::try_from(&stat)?;
            println!("{:?}", state);
            println!("receive: power={} temperature={}", stat.receive.power(), stat.receive.temperature());
        }
        Cmd::Envelope { config, request } => {
            let device = DeviceConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let timestamp = now_timestamp();
            let (command, envelope) = match request {
                Request::Get => (Command::GetAirconStat, device.get_aircon_stat(timestamp)),
                Request::Set { state } => (
                    Command::SetAirconStat,
                    device.set_aircon_stat(state.power, state.temperature, state.mode(), timestamp)?,
                ),
            };
            println!("POST {}", device.endpoint(command));
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
    }

    Ok(())
}

fn decode(
    codec_type: CodecType,
    location: PowerBitLocation,
    dump: bool,
    payload: Option<String>,
) -> anyhow::Result<()> {
    let codec = create_codec(codec_type);

    let lines: Vec<String> = match payload {
        Some(payload) => vec![payload],
        None => io::stdin().lock().lines().collect::<Result<_, _>>()?,
    };

    let mut stdout = io::stdout();
    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        let raw = match codec.decode(line) {
            Ok(raw) => raw,
            Err(err) => {
                log::error!("{err}");
                continue;
            }
        };

        if dump {
            writeln!(stdout, "{}", HexViewBuilder::new(&raw).finish())?;
        }

        // A bad frame is reported and skipped, the next poll may be fine
        match decode_status_frame_with(&raw, location) {
            Ok(report) => writeln!(
                stdout,
                "power: {} mode: {} (raw {})",
                if report.power_on { "on" } else { "off" },
                report.mode.as_ref(),
                report.mode_raw
            )?,
            Err(err) => log::error!("{err}"),
        }
        stdout.flush()?;
    }

    Ok(())
}

fn default_log_level() -> log::LevelFilter {
    if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}
