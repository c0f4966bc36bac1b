mod progress_window;

use log::info;
use structopt::StructOpt;

use deep_dream::{Batch, Error, FilterBank, GradientProvider, LayerSelection, Session};
use progress_window::ProgressWindow;
use std::path::PathBuf;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Tweaks {
    /// The number of gradient ascent steps taken at every octave
    #[structopt(long, default_value = "15")]
    iterations: u32,
    /// The size of each ascent step, relative to the standard deviation of the gradient
    #[structopt(long, default_value = "2.0")]
    step_size: f32,
    /// The scale between two consecutive octaves. Range (0.0, 1.0).
    #[structopt(long, default_value = "0.7")]
    rescale_factor: f32,
    /// The number of times the image is downscaled before the ascent starts
    #[structopt(long, default_value = "5")]
    levels: u32,
    /// How much of the original image is kept when blending in the result of a
    /// coarser octave. Range (0.0 - 1.0)
    #[structopt(long, default_value = "0.25")]
    blend: f32,
    /// Sigma of the Gaussian blur applied to gradients and before downscaling
    #[structopt(long, default_value = "0.5")]
    blur_sigma: f32,
    /// The edge length of the tiles the gradient is evaluated on
    #[structopt(long, default_value = "256")]
    tile_size: usize,
    /// A comma separated list of layer indices to optimize, in order. If not
    /// specified, layers are picked randomly for every pair
    #[structopt(long, use_delimiter = true)]
    layers: Vec<usize>,
    /// The minimum number of randomly picked layers per pair
    #[structopt(long, default_value = "2")]
    min_operations: usize,
    /// The number of randomly picked layers per pair is below this
    #[structopt(long, default_value = "5")]
    max_operations: usize,
    /// The lowest layer index that can be picked randomly
    #[structopt(long, default_value = "2")]
    min_layer: usize,
    /// Randomly picked layer indices are below this
    #[structopt(long, default_value = "10")]
    max_layer: usize,
    /// A seed value for the random generators to get a reproducible result.
    /// A seed is derived from the clock if not specified
    #[structopt(long)]
    seed: Option<u64>,
    /// Carries the left image from one layer to the next, instead of starting
    /// every layer from the original left image
    #[structopt(long)]
    chain_companion: bool,
    /// Don't show progress bars
    #[structopt(long)]
    no_progress: bool,
}

impl Tweaks {
    fn selection(&self) -> LayerSelection {
        if self.layers.is_empty() {
            LayerSelection::Random {
                min_operations: self.min_operations,
                max_operations: self.max_operations,
                min_layer: self.min_layer,
                max_layer: self.max_layer,
            }
        } else {
            LayerSelection::Fixed(self.layers.clone())
        }
    }
}

#[derive(StructOpt)]
#[structopt(
    name = "deep-dream",
    about = "Amplifies the patterns a layer responds to in pairs of images",
    rename_all = "kebab-case"
)]
struct Opt {
    /// Directory of the right images, these drive the gradient ascent
    #[structopt(parse(from_os_str), required_unless = "list-layers")]
    right_input: Option<PathBuf>,
    /// Directory of the left images, paired with the right images by sorted file name
    #[structopt(parse(from_os_str), required_unless = "list-layers")]
    left_input: Option<PathBuf>,
    /// Directory the dreamed right images are saved to
    #[structopt(parse(from_os_str), required_unless = "list-layers")]
    right_output: Option<PathBuf>,
    /// Directory the dreamed left images are saved to
    #[structopt(parse(from_os_str), required_unless = "list-layers")]
    left_output: Option<PathBuf>,
    /// Print the available layers and exit
    #[structopt(long)]
    list_layers: bool,
    /// The maximum number of image pairs processed in parallel.
    /// Defaults to the logical core count.
    #[structopt(short = "t", long = "threads")]
    max_threads: Option<usize>,
    #[structopt(flatten)]
    tweaks: Tweaks,
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn main() {
    let _logger = flexi_logger::Logger::try_with_env_or_str("warn")
        .and_then(|logger| logger.start())
        .map_err(|e| eprintln!("unable to initialize logging: {}", e))
        .ok();

    if let Err(e) = real_main() {
        if atty::is(atty::Stream::Stderr) {
            eprintln!("\x1b[31merror\x1b[0m: {}", e);
        } else {
            eprintln!("error: {}", e);
        }

        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Error> {
    let args = Opt::from_args();
    let provider = FilterBank::default();

    if args.list_layers {
        for layer in provider.layers() {
            println!("{:>3} {}", layer.index, layer.name);
        }
        return Ok(());
    }

    let batch = match (
        &args.right_input,
        &args.left_input,
        &args.right_output,
        &args.left_output,
    ) {
        (Some(ri), Some(li), Some(ro), Some(lo)) => Batch::from_dirs(ri, li, ro, lo)?,
        _ => return Err(Error::NoImages),
    };

    let seed = args.tweaks.seed.unwrap_or_else(clock_seed);
    info!("using seed {}", seed);

    let tweaks = &args.tweaks;
    let mut sb = Session::builder(provider)
        .iterations(tweaks.iterations)
        .step_size(tweaks.step_size)
        .rescale_factor(tweaks.rescale_factor)
        .levels(tweaks.levels)
        .blend(tweaks.blend)
        .blur_sigma(tweaks.blur_sigma)
        .tile_size(tweaks.tile_size)
        .layers(tweaks.selection())
        .seed(seed)
        .chain_companion(tweaks.chain_companion);

    if let Some(mt) = args.max_threads {
        sb = sb.max_thread_count(mt);
    }

    let session = sb.build()?;

    let progress: Option<Box<dyn deep_dream::DreamProgress>> = if !tweaks.no_progress {
        Some(Box::new(ProgressWindow::new(batch.len())))
    } else {
        None
    };

    let reports = session.run(&batch, progress)?;

    for report in reports {
        info!(
            "saved {} and {} ({})",
            report.right.display(),
            report.left.display(),
            report.layers.join(", ")
        );
    }

    Ok(())
}
