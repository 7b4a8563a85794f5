use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mixdown", version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render and encode a timeline window (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Render a timeline window to a 32-bit float WAV.
    Mix(MixArgs),
    /// Print per-clip speed and effect details.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct WindowArgs {
    /// Input timeline JSON.
    #[arg(long)]
    timeline: PathBuf,

    /// Window start in seconds.
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Window end in seconds (defaults to the end of the last clip).
    #[arg(long)]
    end: Option<f64>,

    /// Export settings JSON; flags below override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output sample rate (44100 or 48000).
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Peak-normalize the mix.
    #[arg(long, default_value_t = false)]
    normalize: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    window: WindowArgs,

    /// Output path for the encoded stream (.aac or .ogg).
    #[arg(long)]
    out: PathBuf,

    /// Encoder bitrate in bits per second.
    #[arg(long)]
    bitrate: Option<u32>,
}

#[derive(Args, Debug)]
struct MixArgs {
    #[command(flatten)]
    window: WindowArgs,

    /// Output WAV path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Input timeline JSON.
    #[arg(long)]
    timeline: PathBuf,

    /// Also render the whole timeline and print its peak and RMS levels.
    #[arg(long, default_value_t = false)]
    levels: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Mix(args) => cmd_mix(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_timeline(path: &Path) -> anyhow::Result<mixdown::Timeline> {
    let mut timeline = mixdown::Timeline::from_path(path)?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    for clip in &mut timeline.clips {
        let source = match &mut clip.source {
            mixdown::ClipSource::Audio { path } | mixdown::ClipSource::Video { path, .. } => {
                Some(path)
            }
            mixdown::ClipSource::Nested { mixdown: path } => path.as_mut(),
        };
        if let Some(p) = source
            && p.is_relative()
        {
            *p = root.join(&*p);
        }
    }
    Ok(timeline)
}

fn build_settings(args: &WindowArgs) -> anyhow::Result<mixdown::ExportSettings> {
    let mut settings = match &args.settings {
        Some(path) => mixdown::ExportSettings::from_path(path)?,
        None => mixdown::ExportSettings::default(),
    };
    if let Some(rate) = args.sample_rate {
        settings.sample_rate = rate;
    }
    if args.normalize {
        settings.normalize = true;
    }
    Ok(settings)
}

fn window_for(args: &WindowArgs, timeline: &mixdown::Timeline) -> anyhow::Result<mixdown::TimeWindow> {
    let end = args.end.unwrap_or_else(|| timeline.duration());
    Ok(mixdown::TimeWindow::new(args.start, end)?)
}

/// Run `f` on a worker thread while the main thread logs its progress.
fn with_progress<T: Send>(
    f: impl FnOnce(&mut mixdown::ExportJob<'_>) -> mixdown::MixdownResult<T> + Send,
) -> anyhow::Result<T> {
    let (tx, rx) = crossbeam_channel::unbounded::<mixdown::ExportProgress>();
    std::thread::scope(|scope| {
        let worker = scope.spawn(move || {
            let mut tx = tx;
            let mut job = mixdown::ExportJob::new(mixdown::CancelToken::new(), &mut tx);
            f(&mut job)
        });
        let mut last_percent = -1.0;
        for p in rx.iter() {
            // Throttle to whole-percent steps.
            if p.percent.floor() > last_percent || p.stage == mixdown::ExportStage::Complete {
                last_percent = p.percent.floor();
                tracing::debug!(stage = %p.stage, percent = p.percent, "{}", p.message);
            }
        }
        match worker.join() {
            Ok(result) => Ok(result?),
            Err(_) => anyhow::bail!("export worker panicked"),
        }
    })
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let timeline = load_timeline(&args.window.timeline)?;
    let mut settings = build_settings(&args.window)?;
    if let Some(bitrate) = args.bitrate {
        settings.bitrate = bitrate;
    }
    let window = window_for(&args.window, &timeline)?;
    let pipeline = mixdown::AudioExportPipeline::new(settings)?;
    let mut extractor = mixdown::FileExtractor::new(pipeline.settings().sample_rate);
    let mut encoder = mixdown::FfmpegEncoder::new();

    let outcome = with_progress(|job| {
        pipeline.export(&timeline, window, &mut extractor, &mut encoder, job)
    })?;
    let encoded = match outcome {
        mixdown::ExportOutcome::Complete(encoded) => encoded,
        mixdown::ExportOutcome::NothingToExport => {
            eprintln!("nothing to export: no clip carries audio in the window");
            return Ok(());
        }
        mixdown::ExportOutcome::Cancelled => anyhow::bail!("export cancelled"),
    };

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, encoded.to_bytes())
        .with_context(|| format!("write encoded audio '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({}, {:.2}s, {} bytes)",
        args.out.display(),
        encoded.codec,
        encoded.duration,
        encoded.byte_len()
    );
    Ok(())
}

fn cmd_mix(args: MixArgs) -> anyhow::Result<()> {
    let timeline = load_timeline(&args.window.timeline)?;
    let settings = build_settings(&args.window)?;
    let window = window_for(&args.window, &timeline)?;
    let pipeline = mixdown::AudioExportPipeline::new(settings)?;
    let mut extractor = mixdown::FileExtractor::new(pipeline.settings().sample_rate);

    let outcome =
        with_progress(|job| pipeline.export_raw(&timeline, window, &mut extractor, job))?;
    let Some(mix) = outcome.into_complete() else {
        eprintln!("nothing to mix: no clip carries audio in the window");
        return Ok(());
    };
    mixdown::write_wav(&args.out, &mix)?;
    eprintln!(
        "wrote {} ({:.2}s, peak {:.1} dBFS)",
        args.out.display(),
        mix.duration(),
        mixdown::peak_level_db(&mix)
    );
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let timeline = load_timeline(&args.timeline)?;
    let active = mixdown::active_track_ids(&timeline);
    println!(
        "{} tracks, {} clips, {:.3}s",
        timeline.tracks.len(),
        timeline.clips.len(),
        timeline.duration()
    );
    for clip in &timeline.clips {
        let consumed = mixdown::source_time_at(clip, clip.duration) - clip.in_point;
        let speed_keys = mixdown::keyframes_for(&clip.keyframes, mixdown::SPEED_PROPERTY).len();
        println!(
            "clip {} on {}{}: [{:.3}, {:.3}) speed {} -> {} ({} keys), source {:.3}s from {:.3}s",
            clip.id,
            clip.track_id,
            if active.contains(clip.track_id.as_str()) {
                ""
            } else {
                " (silenced)"
            },
            clip.start_time,
            clip.end_time(),
            mixdown::speed_at(clip, 0.0),
            mixdown::speed_at(clip, clip.duration),
            speed_keys,
            consumed,
            clip.in_point
        );
        for effect in clip.effects.iter().filter(|e| e.enabled) {
            match effect.kind {
                mixdown::EffectKind::AudioVolume => println!(
                    "  volume {}: {:.3}",
                    effect.id,
                    mixdown::effect_param_at(clip, effect, mixdown::VOLUME_PARAM, 0.0)
                ),
                mixdown::EffectKind::AudioEq => {
                    let bands = mixdown::EQ_BAND_PARAMS
                        .iter()
                        .map(|b| format!("{b}={:+.1}", mixdown::effect_param_at(clip, effect, b, 0.0)))
                        .collect::<Vec<_>>();
                    println!("  eq {}: {}", effect.id, bands.join(" "));
                }
                mixdown::EffectKind::Other => {}
            }
        }
    }

    if args.levels {
        let window = mixdown::TimeWindow::new(0.0, timeline.duration())?;
        let pipeline = mixdown::AudioExportPipeline::new(mixdown::ExportSettings::default())?;
        let mut extractor = mixdown::FileExtractor::new(pipeline.settings().sample_rate);
        let outcome =
            with_progress(|job| pipeline.export_raw(&timeline, window, &mut extractor, job))?;
        match outcome.into_complete() {
            Some(mix) => println!(
                "levels: peak {:.2} dBFS, rms {:.2} dBFS",
                mixdown::peak_level_db(&mix),
                mixdown::rms_level_db(&mix)
            ),
            None => println!("levels: no audio"),
        }
    }
    Ok(())
}
