use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

#[allow(unused_imports)]
use log::{Level, trace, debug, info, warn, error};

use yoloview::build_info::BuildInfo;
use yoloview::logging;
use yoloview::{Frame, Split, UserSettings, ViewerSession};

/// Render annotated frames from a YOLO dataset
#[derive(Parser, Debug)]
#[command(name = "yoloview", version, about)]
struct Args {
    /// Dataset directory or its data.yaml
    dataset: Option<PathBuf>,

    /// Split to open: train or val
    #[arg(long)]
    split: Option<Split>,

    /// Position of the first item to render
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Number of consecutive items to render
    #[arg(long, default_value_t = 1)]
    count: usize,

    /// Output PNG file, or a directory when rendering more than one item
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Display width, overrides the settings file
    #[arg(long)]
    width: Option<u32>,

    /// Display height, overrides the settings file
    #[arg(long)]
    height: Option<u32>,

    /// Settings file to use instead of the default location
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print split sizes and class names instead of rendering
    #[arg(long)]
    info: bool,

    /// Write the effective settings file and exit
    #[arg(long)]
    save_settings: bool,

    /// Print detailed build information and exit
    #[arg(long)]
    build_info: bool,

    /// Debug logging in release builds
    #[arg(short, long)]
    verbose: bool,
}

pub fn main() -> ExitCode {
    let args = Args::parse();

    let log_buffer = logging::setup_logger(args.verbose);
    logging::setup_panic_hook(log_buffer);

    if args.build_info {
        println!("{}", BuildInfo::detailed_info());
        return ExitCode::SUCCESS;
    }
    debug!("yoloview {}", BuildInfo::display_version());

    let mut settings = UserSettings::load(args.settings.as_deref());
    if let Some(width) = args.width {
        settings.display_width = width;
    }
    if let Some(height) = args.height {
        settings.display_height = height;
    }

    if args.save_settings {
        return match settings.save(args.settings.as_deref()) {
            Ok(path) => {
                println!("Settings written to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let Some(dataset) = args.dataset.as_deref() else {
        error!("No dataset given. Pass a dataset directory or its data.yaml");
        return ExitCode::FAILURE;
    };

    let mut session = ViewerSession::new(&settings);
    if let Err(e) = session.select_dataset(dataset, args.split) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    if args.info {
        print_info(&mut session);
        return ExitCode::SUCCESS;
    }

    match render_frames(&mut session, &args, settings.display_size()) {
        Ok(0) => {
            warn!("Nothing to render: {}", session.status());
            ExitCode::FAILURE
        }
        Ok(written) => {
            info!("Wrote {} frame(s)", written);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_info(session: &mut ViewerSession) {
    let Some(split) = session.split() else {
        return;
    };
    if let Some(dataset) = session.dataset() {
        println!("Dataset: {}", dataset.root().display());
        println!("Classes ({}):", dataset.names().len());
        for (id, name) in dataset.names().iter().enumerate() {
            println!("  {:>3} {}", id, name);
        }
    }

    for current in [split, split.toggled()] {
        session.set_split(current);
        if let Some(dataset) = session.dataset() {
            println!("{:<5} {:>6} images in {}", current, dataset.len(), dataset.images_dir().display());
        }
    }
    session.set_split(split);
}

/// Render `args.count` items starting at `args.index`. Items whose labels
/// fail to parse are logged and skipped.
fn render_frames(session: &mut ViewerSession, args: &Args, target: (u32, u32)) -> Result<usize, String> {
    if session.is_empty() {
        return Ok(0);
    }
    if args.index >= session.len() {
        return Err(format!("Index {} is out of range, the {} split has {} item(s)",
            args.index, session.split().unwrap_or_default(), session.len()));
    }
    session.seek(args.index);

    let count = args.count.max(1);
    let output = match (&args.output, count) {
        (Some(path), 1) => single_frame_path(path),
        (Some(path), _) => path.clone(),
        (None, 1) => PathBuf::from("frame.png"),
        (None, _) => PathBuf::from("frames"),
    };
    if count > 1 {
        fs::create_dir_all(&output)
            .map_err(|e| format!("Failed to create output directory {}: {}", output.display(), e))?;
    }

    let mut written = 0;
    for _ in 0..count {
        info!("{}", session.status());
        match session.render_current(target) {
            Ok(Some(frame)) => {
                let path = if count > 1 { frame_path(&output, &frame) } else { output.clone() };
                if frame.is_placeholder {
                    warn!("{} could not be decoded, writing a blank frame", frame.image_path.display());
                }
                frame
                    .image
                    .save(&path)
                    .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
                debug!("Wrote {} ({} annotations)", path.display(), frame.annotation_count);
                written += 1;
            }
            Ok(None) => break,
            Err(e) => error!("{}", e),
        }
        if !session.next() {
            break;
        }
    }

    Ok(written)
}

/// Output file for a single frame; a path without an extension is written as PNG
fn single_frame_path(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("png")
    }
}

fn frame_path(dir: &Path, frame: &Frame) -> PathBuf {
    let stem = frame
        .image_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "frame".to_string());
    dir.join(format!("{:05}_{}.png", frame.index, stem))
}
