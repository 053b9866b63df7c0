//! ACARS receiver for RTL-SDR devices and recorded IQ streams.
//!
//! # Usage Examples
//!
//! ## RTL-SDR, single channel
//! ```bash
//! acarsradio -f 131.550M
//! ```
//!
//! ## Scanning a range with squelch
//! ```bash
//! acarsradio -f 131.550M -f 131.725M -l 200 -t 2
//! acarsradio -f 118M:137M:25k -l 200
//! ```
//!
//! ## IQ file playback
//! ```bash
//! acarsradio -f 131.550M --source file --file capture.iq --format cu8
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{ArgAction, Parser, ValueEnum};
use crossbeam::channel;
use tracing::{debug, info, warn};

use acarsradio::output::Printer;
use acarsradio::{Decoder, AUDIO_RATE};
use airband::dsp::{Conditioner, ConditionerConfig};
use airband::{block_len, Error, IqFormat, SampleSource, MAXIMUM_OVERSAMPLE};

const FREQUENCIES_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceType {
    Rtlsdr,
    File,
    Stdin,
    Tcp,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "ACARS receiver for RTL-SDR devices and recorded IQ streams", long_about = None)]
struct Args {
    /// Frequency to tune to in Hz; k/M/G suffixes and start:stop:step
    /// ranges accepted, repeat for scanning (requires squelch)
    #[arg(short = 'f', value_name = "FREQ", required = true)]
    freq: Vec<String>,

    /// Device index
    #[arg(short = 'd', default_value_t = 0)]
    device_index: usize,

    /// Tuner gain in dB (default: automatic)
    #[arg(short = 'g')]
    gain: Option<f64>,

    /// Squelch level (default: 0/off)
    #[arg(short = 'l', default_value_t = 0)]
    squelch_level: i32,

    /// Post-downsample factor, 1 to 16
    #[arg(short = 'o', default_value_t = 1)]
    oversample: usize,

    /// Consecutive silent blocks before hopping; negative values exit
    /// instead of hopping
    #[arg(short = 't', default_value_t = 1, allow_hyphen_values = true)]
    squelch_delay: i32,

    /// Frequency correction in ppm
    #[arg(short = 'p', default_value_t = 0, allow_hyphen_values = true)]
    ppm: i32,

    /// Enable the Hamming FIR instead of the square window
    #[arg(short = 'F')]
    fir: bool,

    /// Log frequency hops
    #[arg(short = 'r')]
    debug_hop: bool,

    /// Verbosity level (-v=info, -vv=debug, -vvv=trace)
    #[arg(short = 'v', action = ArgAction::Count)]
    verbose: u8,

    /// Source type
    #[arg(long, default_value = "rtlsdr")]
    source: SourceType,

    /// Input file path (required when --source file)
    #[arg(long)]
    file: Option<String>,

    /// IQ format for stream input (cu8, cs8)
    #[arg(long, default_value = "cu8")]
    format: String,

    /// TCP address (when --source tcp)
    #[arg(long, default_value = "127.0.0.1")]
    addr: String,

    /// TCP port (when --source tcp)
    #[arg(long, default_value_t = 1234)]
    port: u16,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> airband::Result<()> {
    let args = Args::parse();

    // 0 = WARN (quiet), 1 = INFO, 2 = DEBUG, 3+ = TRACE
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .try_init();

    let freqs = expand_freqs(&args.freq).map_err(Error::config)?;
    if freqs.is_empty() {
        return Err(Error::config("please specify a frequency"));
    }
    if freqs.len() >= FREQUENCIES_LIMIT {
        return Err(Error::config(format!(
            "too many channels, maximum {}",
            FREQUENCIES_LIMIT
        )));
    }
    if freqs.len() > 1 && args.squelch_level == 0 {
        return Err(Error::config(
            "please specify a squelch level, required for scanning multiple frequencies",
        ));
    }
    if args.oversample < 1 || args.oversample > MAXIMUM_OVERSAMPLE {
        return Err(Error::config(format!(
            "oversample must be between 1 and {}",
            MAXIMUM_OVERSAMPLE
        )));
    }
    let format: IqFormat = args.format.parse().map_err(Error::config)?;

    debug!(
        "device {}, gain {:?}, ppm {}, {} channel(s)",
        args.device_index, args.gain, args.ppm, freqs.len()
    );

    let exit_on_silence = args.squelch_delay < 0;
    let squelch_blocks = (args.squelch_delay.unsigned_abs()).max(1);

    let config = ConditionerConfig {
        output_rate: AUDIO_RATE * args.oversample as u32,
        post_downsample: args.oversample,
        fir_enabled: args.fir,
        squelch_level: args.squelch_level,
        squelch_blocks,
        ..ConditionerConfig::default()
    };
    let mut conditioner = Conditioner::new(&config);
    let capture_rate = conditioner.capture_rate();
    let ppm = args.ppm;
    let capture = move |freq: u32, conditioner: &Conditioner| {
        ppm_correct(conditioner.capture_freq(freq), ppm)
    };

    let bytes = block_len(args.oversample);
    info!("Oversampling input by: {}x.", conditioner.downsample());
    info!("Oversampling output by: {}x.", args.oversample);
    info!("Sampling at {} Hz.", capture_rate);
    info!("Tuned to {} Hz.", capture(freqs[0], &conditioner));
    info!(
        "Buffer size: {:.2}ms",
        1000.0 * 0.5 * bytes as f64 / capture_rate as f64
    );

    let source = match args.source {
        SourceType::Rtlsdr => {
            #[cfg(feature = "rtlsdr")]
            {
                let config = airband::rtlsdr::RtlSdrConfig {
                    device_index: args.device_index,
                    capture_freq: capture(freqs[0], &conditioner),
                    capture_rate,
                    gain: args.gain.map(|g| (g * 10.0).round() as i32),
                };
                SampleSource::from_rtlsdr(&config)?
            }
            #[cfg(not(feature = "rtlsdr"))]
            {
                return Err(Error::config(
                    "rtlsdr feature not enabled; rebuild with --features rtlsdr or use --source file",
                ));
            }
        }
        SourceType::File => {
            let path = args
                .file
                .as_ref()
                .ok_or_else(|| Error::config("--file is required when --source file"))?;
            SampleSource::from_file(path, format)?
        }
        SourceType::Stdin => SampleSource::from_stdin(format),
        SourceType::Tcp => SampleSource::from_tcp(&args.addr, args.port, format)?,
    };

    let do_exit = Arc::new(AtomicBool::new(false));
    {
        let do_exit = do_exit.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("Signal caught, exiting!");
            do_exit.store(true, Ordering::Relaxed);
        }) {
            warn!("could not install signal handler: {}", e);
        }
    }

    let (block_tx, block_rx) = channel::bounded::<Vec<u8>>(4);
    let (cmd_tx, cmd_rx) = channel::unbounded::<u32>();

    let producer = {
        let do_exit = do_exit.clone();
        let mut source = source;
        std::thread::spawn(move || {
            loop {
                if do_exit.load(Ordering::Relaxed) {
                    break;
                }
                while let Ok(freq) = cmd_rx.try_recv() {
                    if let Err(e) = source.retune(freq) {
                        warn!("retune failed: {}", e);
                    }
                }
                let mut block = vec![0u8; bytes];
                match source.read_block(&mut block) {
                    Ok(0) => break,
                    Ok(n) => {
                        block.truncate(n);
                        if block_tx.send(block).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("sample read failed: {}", e);
                        break;
                    }
                }
            }
        })
    };

    println!("Listening for ACARS traffic...");

    let mut decoder = Decoder::new();
    let mut sink = Printer::stdout();
    let mut freq_now = 0usize;

    for mut block in block_rx.iter() {
        let conditioned = conditioner.process(&mut block);
        decoder.process(conditioned.audio, &mut sink);
        if !conditioned.silent {
            continue;
        }
        if exit_on_silence {
            info!("silence threshold reached, exiting");
            break;
        }
        if freqs.len() > 1 {
            freq_now = (freq_now + 1) % freqs.len();
            let next = capture(freqs[freq_now], &conditioner);
            if args.debug_hop {
                info!("Hopping to {} Hz", freqs[freq_now]);
            } else {
                debug!("hopping to {} Hz", freqs[freq_now]);
            }
            let _ = cmd_tx.send(next);
            conditioner.squelch_reload();
        }
    }

    do_exit.store(true, Ordering::Relaxed);
    drop(block_rx);
    let _ = producer.join();
    info!("{} message(s) received", decoder.rx_idx());
    Ok(())
}

/// Software stand-in for the tuner's ppm correction: nudge the capture
/// frequency by the oscillator error.
fn ppm_correct(freq: u32, ppm: i32) -> u32 {
    ((freq as i64 * (1_000_000 + ppm as i64)) / 1_000_000) as u32
}

/// Parse a frequency with the standard k/M/G suffixes.
fn atofs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    for (suffix, mult) in [
        ("g", 1e9),
        ("G", 1e9),
        ("m", 1e6),
        ("M", 1e6),
        ("k", 1e3),
        ("K", 1e3),
    ] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            return stripped
                .trim()
                .parse::<f64>()
                .map(|v| v * mult)
                .map_err(|_| format!("invalid frequency: {}", s));
        }
    }
    s.parse::<f64>()
        .map_err(|_| format!("invalid frequency: {}", s))
}

/// Expand `-f` arguments into a channel list; `start:stop:step` ranges
/// are enumerated inclusively.
fn expand_freqs(specs: &[String]) -> Result<Vec<u32>, String> {
    let mut freqs = Vec::new();
    for spec in specs {
        if spec.contains(':') {
            let parts: Vec<&str> = spec.split(':').collect();
            if parts.len() != 3 {
                return Err(format!("range must be start:stop:step: {}", spec));
            }
            let start = atofs(parts[0])? as i64;
            let stop = atofs(parts[1])? as i64;
            let step = atofs(parts[2])? as i64;
            if step <= 0 {
                return Err(format!("range step must be positive: {}", spec));
            }
            let mut f = start;
            while f <= stop && freqs.len() < FREQUENCIES_LIMIT {
                freqs.push(f as u32);
                f += step;
            }
        } else {
            freqs.push(atofs(spec)? as u32);
        }
        if freqs.len() >= FREQUENCIES_LIMIT {
            break;
        }
    }
    Ok(freqs)
}
