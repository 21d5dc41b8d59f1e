//! Garrotxa command line host
//!
//! ```text
//! garrotxa render [--param name=value]... [--blocks N] [--state path]
//! garrotxa live   [--param name=value]... [--state path]
//! garrotxa params
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{select, unbounded};
use garrotxa_core::{
    AudioStream, Event, HostConfig, MeterPoller, ParamId, Plugin, PluginState,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const RENDER_SAMPLE_RATE: f64 = 44100.0;
const RENDER_BLOCK_SIZE: usize = 512;
const RENDER_FREQUENCY: f64 = 1000.0;
const RENDER_AMPLITUDE: f64 = 0.1;

const USAGE: &str = "\
usage:
  garrotxa render [--param name=value]... [--blocks N] [--state path]
  garrotxa live   [--param name=value]... [--state path]
  garrotxa params";

#[derive(Debug, Default)]
struct Options {
    params: Vec<(String, f32)>,
    blocks: Option<usize>,
    state: Option<PathBuf>,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self> {
        let mut options = Options::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| anyhow!("{} needs a value", flag))
            };
            match arg.as_str() {
                "--param" | "-p" => {
                    let assignment = value(arg.as_str())?;
                    let (name, raw) = assignment
                        .split_once('=')
                        .ok_or_else(|| anyhow!("expected name=value, got '{}'", assignment))?;
                    let number: f32 = raw
                        .parse()
                        .with_context(|| format!("invalid value for '{}'", name))?;
                    options.params.push((name.to_string(), number));
                }
                "--blocks" | "-n" => {
                    let raw = value(arg.as_str())?;
                    let blocks = raw
                        .parse::<usize>()
                        .with_context(|| format!("invalid block count '{}'", raw))?;
                    options.blocks = Some(blocks);
                }
                "--state" | "-s" => options.state = Some(PathBuf::from(value(arg.as_str())?)),
                other => bail!("unknown argument '{}'\n{}", other, USAGE),
            }
        }
        Ok(options)
    }

    /// Explicit path, else the platform default
    fn state_path(&self) -> Option<PathBuf> {
        self.state.clone().or_else(|| PluginState::default_path().ok())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("garrotxa=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("missing command\n{}", USAGE);
    };

    match command.as_str() {
        "render" => render(Options::parse(rest)?),
        "live" => live(Options::parse(rest)?),
        "params" => {
            print_params();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

/// Load saved state (if any), then apply `--param` overrides
fn configure(plugin: &Plugin, options: &Options, load_default_state: bool) -> Result<()> {
    let path = if load_default_state {
        options.state_path()
    } else {
        options.state.clone()
    };

    if let Some(path) = path.filter(|p| p.exists()) {
        match std::fs::read(&path) {
            Ok(bytes) => {
                plugin.restore_state(&bytes);
            }
            Err(e) => warn!("Could not read {:?}: {}", path, e),
        }
    }

    for (name, value) in &options.params {
        let stored = plugin.params().set_by_name(name, *value)?;
        if stored != *value {
            warn!("{} = {} out of range, clamped to {}", name, value, stored);
        }
    }
    Ok(())
}

fn render(options: Options) -> Result<()> {
    let mut plugin = Plugin::new();
    configure(&plugin, &options, false)?;
    plugin.prepare(RENDER_SAMPLE_RATE, RENDER_BLOCK_SIZE, 1)?;

    let blocks = options.blocks.unwrap_or(1);
    let mut block = vec![0.0_f32; RENDER_BLOCK_SIZE];
    let step = 2.0 * std::f64::consts::PI * RENDER_FREQUENCY / RENDER_SAMPLE_RATE;

    println!("block      rms   rms dB  led");
    for index in 0..blocks {
        let offset = index * RENDER_BLOCK_SIZE;
        for (i, sample) in block.iter_mut().enumerate() {
            *sample = (RENDER_AMPLITUDE * (step * (offset + i) as f64).sin()) as f32;
        }

        let rms = plugin.process(&mut [&mut block]);
        let meter = plugin.meter();
        println!(
            "{:>5} {:>8.5} {:>8.2} {:>4.2}",
            index,
            rms,
            meter.rms_db(),
            meter.led_brightness()
        );
    }
    Ok(())
}

fn live(options: Options) -> Result<()> {
    let config = HostConfig {
        state_path: options.state_path(),
        ..Default::default()
    };
    config.validate()?;

    let plugin = Plugin::new();
    configure(&plugin, &options, true)?;
    let params = plugin.params().clone();

    let (event_sender, event_receiver) = unbounded();
    let stream = AudioStream::open_default(config.stream.clone(), plugin, event_sender.clone())?;
    let _poller = MeterPoller::spawn(stream.meter().clone(), config.meter_rate_hz, event_sender)?;

    info!(
        "Processing latency {:.2} samples, press Enter to stop",
        stream.latency_samples()
    );

    let (quit_sender, quit_receiver) = unbounded::<()>();
    thread::Builder::new()
        .name("garrotxa-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
            let _ = quit_sender.send(());
        })?;

    let mut stdout = io::stdout();
    loop {
        select! {
            recv(event_receiver) -> event => match event {
                Ok(Event::LevelUpdate { rms, brightness }) => {
                    let lit = (brightness * 20.0).round() as usize;
                    write!(stdout, "\r[{:<20}] {:>7.4}", "#".repeat(lit), rms)?;
                    stdout.flush()?;
                }
                Ok(Event::BufferUnderrun) => {}
                Ok(Event::Overrun) => debug!("Capture overrun, input dropped"),
                Ok(Event::StreamError { message }) => warn!("Stream error: {}", message),
                Err(_) => break,
            },
            recv(quit_receiver) -> _ => break,
        }
    }
    println!();

    drop(stream);

    if let Some(path) = &config.state_path {
        PluginState::capture(&params)
            .save_to(path)
            .with_context(|| format!("saving state to {:?}", path))?;
    }
    Ok(())
}

fn print_params() {
    println!("{:<10} {:<9} {:>8} {:>8} {:>8}  unit", "name", "label", "min", "max", "default");
    for id in ParamId::ALL {
        let range = id.range();
        println!(
            "{:<10} {:<9} {:>8} {:>8} {:>8}  {}",
            id.name(),
            id.label(),
            range.min,
            range.max,
            range.default,
            id.unit()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_options() {
        let options = Options::parse(&args(&[
            "--param", "gain=4", "-p", "out=-6", "--blocks", "3", "--state", "/tmp/s.json",
        ]))
        .unwrap();

        assert_eq!(
            options.params,
            vec![("gain".to_string(), 4.0_f32), ("out".to_string(), -6.0_f32)]
        );
        assert_eq!(options.blocks, Some(3));
        assert_eq!(options.state, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Options::parse(&args(&["--param", "gain"])).is_err());
        assert!(Options::parse(&args(&["--param", "gain=loud"])).is_err());
        assert!(Options::parse(&args(&["--blocks"])).is_err());
        assert!(Options::parse(&args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn test_configure_applies_overrides() {
        let plugin = Plugin::new();
        let options = Options {
            params: vec![("treble".to_string(), 50.0)],
            ..Default::default()
        };
        configure(&plugin, &options, false).unwrap();
        assert_eq!(plugin.params().get(ParamId::Treble), 12.0);

        let unknown = Options {
            params: vec![("volume".to_string(), 1.0)],
            ..Default::default()
        };
        assert!(configure(&plugin, &unknown, false).is_err());
    }
}
