use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use tab_capture::api;
use tab_capture::core::cancel::CancelToken;
use tab_capture::core::layout::PageLayout;
use tab_capture::core::time::parse_time;
use tab_capture::core::video::open_source;
use tab_capture::frame_extractor::ExtractionConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract stable captures from a video and pack them into a PDF
    Extract {
        /// Video file, or a directory of frame images
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Frame rate of an image-sequence directory
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
        /// JSON config; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        x_start: Option<f64>,
        #[arg(long)]
        x_end: Option<f64>,
        #[arg(long)]
        y_start: Option<f64>,
        #[arg(long)]
        y_end: Option<f64>,
        /// Sampling interval in seconds
        #[arg(long)]
        interval: Option<f64>,
        #[arg(short, long)]
        threshold: Option<f64>,
        #[arg(long)]
        stable_sec: Option<f64>,
        /// Seconds, mm:ss or hh:mm:ss
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Also save every capture as frame_NNNN.png here
        #[arg(long)]
        inspect_dir: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        one_per_page: bool,
        /// Abort the run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Save the frame at a given time as JPEG
    Preview {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value = "0")]
        time: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
        #[arg(short, long, default_value_t = api::DEFAULT_PREVIEW_QUALITY)]
        quality: u8,
    },
    /// Pack selected images into a PDF, in the given order
    Compose {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long, default_value_t = false)]
        one_per_page: bool,
    },
}

fn main() -> Result<()> {
    tab_capture::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            fps,
            config,
            x_start,
            x_end,
            y_start,
            y_end,
            interval,
            threshold,
            stable_sec,
            start,
            end,
            inspect_dir,
            one_per_page,
            timeout,
        } => {
            if output.is_none() && inspect_dir.is_none() {
                bail!("nothing to do: pass --output and/or --inspect-dir");
            }

            let mut config = match config {
                Some(path) => ExtractionConfig::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => ExtractionConfig::default(),
            };
            let roi = &mut config.roi;
            roi.x_start = x_start.unwrap_or(roi.x_start);
            roi.x_end = x_end.unwrap_or(roi.x_end);
            roi.y_start = y_start.unwrap_or(roi.y_start);
            roi.y_end = y_end.unwrap_or(roi.y_end);
            if let Some(v) = interval {
                config.sampling_interval_sec = v;
            }
            if let Some(v) = threshold {
                config.change_threshold = v;
            }
            if let Some(v) = stable_sec {
                config.stability.stable_duration_sec = v;
            }
            if let Some(v) = parse_time(start.as_deref())? {
                config.start_time = Some(v);
            }
            if let Some(v) = parse_time(end.as_deref())? {
                config.end_time = Some(v);
            }

            let cancel = match timeout {
                Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
                None => CancelToken::new(),
            };
            let handle = cancel.clone();
            ctrlc::set_handler(move || handle.cancel())
                .context("Error registering Ctrl-C handler")?;

            let mut source = open_source(&input, fps)?;
            let result = api::extract_regions(&mut source, &config, &cancel)?;

            if let Some(dir) = inspect_dir {
                let paths = api::save_captures(&result.regions, &dir)?;
                println!("saved {} captures to {}", paths.len(), dir.display());
            }
            if let Some(output) = output {
                let layout = PageLayout {
                    one_per_page,
                    ..Default::default()
                };
                let pdf = api::render_regions_pdf(&result.regions, &layout)?;
                std::fs::write(&output, pdf)
                    .with_context(|| format!("writing {}", output.display()))?;
                info!("📄 wrote {}", output.display());
            }
            println!("{}", serde_json::to_string_pretty(&result.stats)?);
        }
        Commands::Preview {
            input,
            time,
            output,
            fps,
            quality,
        } => {
            let at = parse_time(Some(time.as_str()))?.unwrap_or(0.0);
            let mut source = open_source(&input, fps)?;
            let jpeg = api::preview_frame(&mut source, at, quality)?;
            std::fs::write(&output, jpeg)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("preview at {:.2}s -> {}", at, output.display());
        }
        Commands::Compose {
            output,
            images,
            one_per_page,
        } => {
            let layout = PageLayout {
                one_per_page,
                ..Default::default()
            };
            let pdf = api::compose_pdf_from_files(&images, &layout)?;
            std::fs::write(&output, pdf)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("wrote {}", output.display());
        }
    }

    Ok(())
}
