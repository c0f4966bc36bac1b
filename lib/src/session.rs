use crate::*;
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Deep dream session.
///
/// A session owns the gradient provider and the validated parameters, and
/// can dream single image pairs in memory via `dream()`, or process every
/// pair of a `Batch` and save the results via `run()`.
///
/// # Example
/// ```no_run
/// let session = deep_dream::Session::builder(deep_dream::FilterBank::default())
///     .seed(10)
///     .levels(3)
///     .build().expect("failed to build session");
///
/// let batch = deep_dream::Batch::from_dirs("in/right", "in/left", "out/right", "out/left")
///     .expect("failed to list the input directories");
///
/// session.run(&batch, None).expect("failed to dream");
/// ```
pub struct Session<P> {
    provider: P,
    params: Parameters,
}

impl<P: GradientProvider> Session<P> {
    /// Creates a new session builder with default parameters.
    pub fn builder(provider: P) -> SessionBuilder<P> {
        SessionBuilder::new(provider)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Dreams a single pair in memory.
    ///
    /// A sequence of layers is picked with `rng`, and the octave ascent is
    /// applied once per layer. The primary (right) image is chained from one
    /// layer to the next. Unless `chain_companion` is set, every layer starts
    /// again from the original companion (left) image, and the returned
    /// companion is the result of the last layer.
    pub fn dream<R, F>(
        &self,
        right: &Image,
        left: &Image,
        rng: &mut R,
        mut on_update: F,
    ) -> Result<DreamedPair, Error>
    where
        R: Rng + ?Sized,
        F: FnMut(DreamUpdate<'_>),
    {
        let layers = self
            .params
            .selection
            .choose(rng)
            .into_iter()
            .map(|index| self.provider.layer(index).map(Clone::clone))
            .collect::<Result<Vec<_>, Error>>()?;

        let dreamer = Dreamer::new(&self.provider, &self.params.dream);
        let mut primary = right.clone();
        let mut companion = left.clone();

        for (i, layer) in layers.iter().enumerate() {
            info!("layer {} ({} of {})", layer.name, i + 1, layers.len());
            let layer_stat = ProgressStat {
                current: i + 1,
                total: layers.len(),
            };

            let baseline = if self.params.chain_companion {
                &companion
            } else {
                left
            };

            let (p, c) = dreamer.recurse(layer, &primary, baseline, rng, |step| {
                on_update(DreamUpdate {
                    layer,
                    layers: layer_stat,
                    step,
                })
            })?;

            primary = p;
            companion = c;
        }

        Ok(DreamedPair {
            right: primary,
            left: companion,
            layers,
        })
    }

    fn process_pair(
        &self,
        index: usize,
        total: usize,
        pair: &BatchPair,
        progress: &Mutex<Option<Box<dyn DreamProgress>>>,
    ) -> Result<DreamReport, Error> {
        info!(
            "pair {} of {}: {} / {}",
            index + 1,
            total,
            pair.right_input.display(),
            pair.left_input.display()
        );

        let right = load_image(ImageSource::from_path(&pair.right_input))?;
        let left = load_image(ImageSource::from_path(&pair.left_input))?;

        let mut rng = Pcg32::seed_from_u64(self.params.seed.wrapping_add(index as u64));
        let pair_stat = ProgressStat {
            current: index + 1,
            total,
        };

        let dreamed = self.dream(&right, &left, &mut rng, |update| {
            if let Some(ref mut progress) = *progress.lock().unwrap() {
                progress.update(ProgressUpdate {
                    pair: pair_stat,
                    layer_name: &update.layer.name,
                    layer: update.layers,
                    octave: update.step.octave,
                    iteration: update.step.iteration,
                });
            }
        })?;

        save_image(&dreamed.right, &pair.right_output)?;
        save_image(&dreamed.left, &pair.left_output)?;

        Ok(DreamReport {
            right: pair.right_output.clone(),
            left: pair.left_output.clone(),
            layers: dreamed.layers.into_iter().map(|l| l.name).collect(),
        })
    }

    /// Dreams every pair of the batch and saves the results.
    ///
    /// Pairs are independent, so they are spread over up to
    /// `max_thread_count` threads. Each pair uses its own random generator
    /// seeded from the session seed and the pair's position, so results don't
    /// depend on the thread count. The first error stops the batch, pairs
    /// that were already saved are left on disk.
    pub fn run(
        &self,
        batch: &Batch,
        progress: Option<Box<dyn DreamProgress>>,
    ) -> Result<Vec<DreamReport>, Error> {
        let total = batch.pairs.len();
        let max_workers = self.params.max_thread_count.unwrap_or_else(num_cpus::get);
        let n_workers = max_workers.min(total).max(1);

        let progress = Mutex::new(progress);
        let next_pair = AtomicUsize::new(0);
        let reports = Mutex::new(Vec::with_capacity(total));
        let first_error: Mutex<Option<Error>> = Mutex::new(None);

        let worker_fn = || loop {
            if first_error.lock().unwrap().is_some() {
                break;
            }

            let index = next_pair.fetch_add(1, Ordering::Relaxed);
            if index >= total {
                break;
            }

            match self.process_pair(index, total, &batch.pairs[index], &progress) {
                Ok(report) => reports.lock().unwrap().push((index, report)),
                Err(err) => {
                    first_error.lock().unwrap().get_or_insert(err);
                    break;
                }
            }
        };

        // for WASM we do not have threads and crossbeam panics
        #[cfg(target_arch = "wasm32")]
        (worker_fn)();

        #[cfg(not(target_arch = "wasm32"))]
        {
            if n_workers == 1 {
                (worker_fn)();
            } else {
                let scoped = crossbeam_utils::thread::scope(|scope| {
                    for _ in 0..n_workers {
                        scope.spawn(|_| (worker_fn)());
                    }
                });

                if let Err(panic) = scoped {
                    std::panic::resume_unwind(panic);
                }
            }
        }

        if let Some(err) = first_error.into_inner().unwrap() {
            return Err(err);
        }

        let mut reports = reports.into_inner().unwrap();
        reports.sort_by_key(|(index, _)| *index);
        Ok(reports.into_iter().map(|(_, report)| report).collect())
    }
}

/// Builds a session by setting parameters, calling `build` checks that all
/// of them are in range for the provider
pub struct SessionBuilder<P> {
    provider: P,
    params: Parameters,
}

impl<P: GradientProvider> SessionBuilder<P> {
    /// Creates a new `SessionBuilder`, can also be created via
    /// `Session::builder()`
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            params: Parameters::default(),
        }
    }

    /// Number of gradient ascent steps taken at every octave.
    ///
    /// Default: 15
    pub fn iterations(mut self, count: u32) -> Self {
        self.params.dream.iterations = count;
        self
    }

    /// Size of each ascent step. The gradient is normalized by its standard
    /// deviation, so this is roughly how far pixels move per step.
    ///
    /// Default: 2.0
    pub fn step_size(mut self, value: f32) -> Self {
        self.params.dream.step_size = value;
        self
    }

    /// Scale between two consecutive octaves. Range (0,1).
    ///
    /// Default: 0.7
    pub fn rescale_factor(mut self, value: f32) -> Self {
        self.params.dream.rescale_factor = value;
        self
    }

    /// Number of times the image is downscaled before ascent starts, 0 only
    /// optimizes at full resolution.
    ///
    /// Default: 5
    pub fn levels(mut self, count: u32) -> Self {
        self.params.dream.levels = count;
        self
    }

    /// How much of the original image is kept when an octave is blended with
    /// the upscaled result of the coarser one. Range (0,1).
    ///
    /// Default: 0.25
    pub fn blend(mut self, value: f32) -> Self {
        self.params.dream.blend = value;
        self
    }

    /// Sigma of the Gaussian blur applied to every gradient, and to the images
    /// before they are downscaled. 0 disables blurring.
    ///
    /// Default: 0.5
    pub fn blur_sigma(mut self, value: f32) -> Self {
        self.params.dream.blur_sigma = value;
        self
    }

    /// Edge length of the tiles the gradient is evaluated on. Larger tiles
    /// need more memory per provider call.
    ///
    /// Default: 256
    pub fn tile_size(mut self, size: usize) -> Self {
        self.params.dream.tile_size = size;
        self
    }

    /// How the layers are picked for every pair.
    ///
    /// Default: 2 to 4 distinct random layers out of layers 2 to 9
    pub fn layers(mut self, selection: LayerSelection) -> Self {
        self.params.selection = selection;
        self
    }

    /// Changes the seed of the random generators.
    ///
    /// The same seed, parameters and inputs always produce the same images.
    ///
    /// Default: 0
    pub fn seed(mut self, value: u64) -> Self {
        self.params.seed = value;
        self
    }

    /// Carries the companion image from one layer to the next, instead of
    /// restarting every layer from the original companion.
    ///
    /// Default: false
    pub fn chain_companion(mut self, chain: bool) -> Self {
        self.params.chain_companion = chain;
        self
    }

    /// Controls the maximum number of pairs that are processed in parallel.
    ///
    /// Default: The number of logical cores on this system.
    pub fn max_thread_count(mut self, count: usize) -> Self {
        self.params.max_thread_count = Some(count);
        self
    }

    /// Creates a `Session`, or returns an error if invalid parameters were
    /// specified.
    pub fn build(self) -> Result<Session<P>, Error> {
        self.check_parameters_validity()?;
        self.params
            .selection
            .validate(self.provider.layers().len())?;

        Ok(Session {
            provider: self.provider,
            params: self.params,
        })
    }

    fn check_parameters_validity(&self) -> Result<(), Error> {
        let dream = &self.params.dream;

        if dream.iterations == 0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 1.0,
                max: 1024.0,
                value: dream.iterations as f32,
                name: "iterations",
            }));
        }

        if !dream.step_size.is_finite() || dream.step_size <= 0.0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 0.0,
                max: f32::INFINITY,
                value: dream.step_size,
                name: "step-size",
            }));
        }

        if dream.rescale_factor.is_nan() || dream.rescale_factor <= 0.0 || dream.rescale_factor >= 1.0
        {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 0.0,
                max: 1.0,
                value: dream.rescale_factor,
                name: "rescale-factor",
            }));
        }

        if dream.blend.is_nan() || dream.blend < 0.0 || dream.blend > 1.0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 0.0,
                max: 1.0,
                value: dream.blend,
                name: "blend",
            }));
        }

        if !dream.blur_sigma.is_finite() || dream.blur_sigma < 0.0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 0.0,
                max: f32::INFINITY,
                value: dream.blur_sigma,
                name: "blur-sigma",
            }));
        }

        if dream.tile_size == 0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 1.0,
                max: 4096.0,
                value: dream.tile_size as f32,
                name: "tile-size",
            }));
        }

        if let Some(max_count) = self.params.max_thread_count {
            if max_count == 0 {
                return Err(Error::InvalidRange(errors::InvalidRange {
                    min: 1.0,
                    max: 1024.0,
                    value: max_count as f32,
                    name: "max-thread-count",
                }));
            }
        }

        Ok(())
    }
}

/// One pair of input files and where their results are saved
#[derive(Clone, Debug)]
pub struct BatchPair {
    pub right_input: PathBuf,
    pub left_input: PathBuf,
    pub right_output: PathBuf,
    pub left_output: PathBuf,
}

/// The image pairs processed by `Session::run`
#[derive(Clone, Debug)]
pub struct Batch {
    pairs: Vec<BatchPair>,
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

fn output_path(dir: &Path, input: &Path) -> PathBuf {
    let mut name = input.file_name().unwrap_or_default().to_os_string();
    name.push(".jpeg");
    dir.join(name)
}

impl Batch {
    pub fn new(pairs: Vec<BatchPair>) -> Result<Self, Error> {
        if pairs.is_empty() {
            return Err(Error::NoImages);
        }

        Ok(Self { pairs })
    }

    /// Pairs the files of two input directories by their position in the
    /// sorted listings. Results are written as `<input file name>.jpeg` into
    /// the respective output directory.
    pub fn from_dirs<P1, P2, P3, P4>(
        right_input: P1,
        left_input: P2,
        right_output: P3,
        left_output: P4,
    ) -> Result<Self, Error>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
        P3: AsRef<Path>,
        P4: AsRef<Path>,
    {
        let rights = list_files(right_input.as_ref())?;
        let lefts = list_files(left_input.as_ref())?;

        if rights.len() != lefts.len() {
            warn!(
                "{} right images but {} left images, the extra images are ignored",
                rights.len(),
                lefts.len()
            );
        }

        let pairs = rights
            .into_iter()
            .zip(lefts.into_iter())
            .map(|(right, left)| BatchPair {
                right_output: output_path(right_output.as_ref(), &right),
                left_output: output_path(left_output.as_ref(), &left),
                right_input: right,
                left_input: left,
            })
            .collect();

        Self::new(pairs)
    }

    pub fn pairs(&self) -> &[BatchPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The result of dreaming a pair in memory
pub struct DreamedPair {
    pub right: Image,
    pub left: Image,
    /// The layers that were optimized, in order
    pub layers: Vec<Layer>,
}

/// A pair that was dreamed and saved by `Session::run`
#[derive(Clone, Debug)]
pub struct DreamReport {
    pub right: PathBuf,
    pub left: PathBuf,
    /// Names of the layers that were optimized, in order
    pub layers: Vec<String>,
}

/// Helper struct for passing progress information to external callers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressStat {
    /// The current amount of work that has been done
    pub current: usize,
    /// The total amount of work to do
    pub total: usize,
}

/// Progress of a single pair, passed to the callback of `Session::dream`
pub struct DreamUpdate<'a> {
    /// The layer currently being optimized
    pub layer: &'a Layer,
    /// Position of that layer in the pair's layer sequence
    pub layers: ProgressStat,
    pub step: StepUpdate,
}

/// The current state of a batch
pub struct ProgressUpdate<'a> {
    /// The pair being dreamed
    pub pair: ProgressStat,
    /// Name of the layer currently being optimized
    pub layer_name: &'a str,
    /// Position of that layer in the pair's layer sequence
    pub layer: ProgressStat,
    /// The octave being optimized, counting from the coarsest
    pub octave: ProgressStat,
    /// The ascent step within the octave
    pub iteration: ProgressStat,
}

/// Allows a session to update external callers with the current
/// progress of a batch
pub trait DreamProgress: Send {
    fn update(&mut self, info: ProgressUpdate<'_>);
}

impl<G> DreamProgress for G
where
    G: FnMut(ProgressUpdate<'_>) + Send,
{
    fn update(&mut self, info: ProgressUpdate<'_>) {
        self(info)
    }
}
