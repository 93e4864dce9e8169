//! detectd - detection streaming daemon
//!
//! Two modes:
//! 1. Session mode (default): create a session on the configured source and
//!    publish one JSON line per processed frame to stdout until the stream
//!    ends or Ctrl-C cancels it.
//! 2. Pull mode (`--pull`): iterate the source synchronously, writing
//!    multipart JPEG chunks (or JSON lines with `--results-json`) to stdout.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use detect_stream::config::{parse_cadence, DaemonConfig};
use detect_stream::{
    AnnotatedChunk, AnnotatedStream, DetectorBackend, JsonLinesPublisher, PullMode, SourceConfig,
    StreamService, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video source: file path, stream URL, or stub://name[?frames=N].
    #[arg(long)]
    source: Option<String>,

    /// ONNX model path (requires the backend-tract feature). Omit for the
    /// stub backend.
    #[arg(long)]
    model: Option<std::path::PathBuf>,

    /// Object confidence threshold.
    #[arg(long)]
    conf: Option<f32>,

    /// IoU threshold for duplicate-box suppression.
    #[arg(long)]
    iou: Option<f32>,

    /// Model input size (square).
    #[arg(long)]
    imgsz: Option<u32>,

    /// Comma-separated class filter, e.g. "person,car".
    #[arg(long)]
    classes: Option<String>,

    /// Seconds between frame reads (session mode). 0 disables throttling.
    #[arg(long)]
    cadence: Option<f64>,

    /// Pull mode: consume the source synchronously instead of streaming.
    #[arg(long, default_value_t = false)]
    pull: bool,

    /// In pull mode, emit JSON result chunks instead of annotated JPEG.
    #[arg(long, default_value_t = false)]
    results_json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = DaemonConfig::load()?;
    apply_args(&mut cfg, &args)?;

    let detector = build_detector(&cfg)?;
    detector.warm_up().map_err(|e| anyhow!("detector warm-up failed: {}", e))?;
    log::info!(
        "detector backend: {} (conf={}, iou={}, imgsz={})",
        detector.name(),
        cfg.options.confidence,
        cfg.options.iou,
        cfg.options.image_size
    );

    if args.pull {
        run_pull(&cfg, detector, args.results_json)
    } else {
        run_session_mode(&cfg, detector)
    }
}

fn apply_args(cfg: &mut DaemonConfig, args: &Args) -> Result<()> {
    if let Some(source) = &args.source {
        cfg.source = source.clone();
    }
    if let Some(model) = &args.model {
        cfg.model = Some(model.clone());
    }
    if let Some(conf) = args.conf {
        cfg.options.confidence = conf;
    }
    if let Some(iou) = args.iou {
        cfg.options.iou = iou;
    }
    if let Some(imgsz) = args.imgsz {
        cfg.options.image_size = imgsz;
    }
    if let Some(classes) = &args.classes {
        let parsed: Vec<String> = classes
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if !parsed.is_empty() {
            cfg.options.classes = Some(parsed);
        }
    }
    if let Some(cadence) = args.cadence {
        cfg.cadence = parse_cadence(cadence)?;
    }
    cfg.options.validate().map_err(|e| anyhow!(e))?;
    Ok(())
}

fn build_detector(cfg: &DaemonConfig) -> Result<Arc<dyn DetectorBackend>> {
    match &cfg.model {
        None => Ok(Arc::new(StubBackend::new())),
        Some(model_path) => {
            #[cfg(feature = "backend-tract")]
            {
                let backend = detect_stream::TractBackend::new(model_path, &cfg.options)
                    .with_context(|| format!("load model {}", model_path.display()))?;
                Ok(Arc::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!(
                    "model '{}' requires the backend-tract feature",
                    model_path.display()
                ))
            }
        }
    }
}

fn run_session_mode(cfg: &DaemonConfig, detector: Arc<dyn DetectorBackend>) -> Result<()> {
    let service = StreamService::new(detector)
        .with_cadence(cfg.cadence)
        .with_options(cfg.options.clone());

    let publisher = JsonLinesPublisher::new(std::io::stdout());
    let session_id = service
        .create_session(&cfg.source, Box::new(publisher))
        .with_context(|| format!("create session on '{}'", cfg.source))?;
    log::info!("session {} streaming from {}", session_id, cfg.source);

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_handler = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_handler.store(true, Ordering::SeqCst);
    })
    .context("install Ctrl-C handler")?;

    let registry = service.registry();
    let mut last_health_log = Instant::now();
    loop {
        if interrupted.load(Ordering::SeqCst) {
            log::info!("interrupt received, cancelling sessions");
            service.shutdown();
            break;
        }
        if registry.is_empty() {
            log::info!("all sessions finished");
            break;
        }
        if last_health_log.elapsed() >= Duration::from_secs(5) {
            log::info!("active sessions: {}", registry.len());
            last_health_log = Instant::now();
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Ok(())
}

fn run_pull(cfg: &DaemonConfig, detector: Arc<dyn DetectorBackend>, results_json: bool) -> Result<()> {
    let mode = if results_json {
        PullMode::Json
    } else {
        PullMode::AnnotatedJpeg
    };
    let stream = AnnotatedStream::open(
        &SourceConfig::new(&cfg.source),
        detector,
        cfg.options.clone(),
        mode,
    )
    .with_context(|| format!("open '{}'", cfg.source))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut chunks = 0u64;
    for chunk in stream {
        match chunk? {
            AnnotatedChunk::Json(json) => {
                writeln!(out, "{}", json)?;
            }
            AnnotatedChunk::Jpeg(bytes) => {
                // Multipart framing, one part per frame.
                out.write_all(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n")?;
                out.write_all(&bytes)?;
                out.write_all(b"\r\n")?;
            }
        }
        out.flush()?;
        chunks += 1;
    }
    log::info!("pull stream finished after {} chunk(s)", chunks);
    Ok(())
}
