// BEGIN - Embark standard lints v0.4
// do not change or add/remove here, but one can add exceptions after this section
// for more info see: <https://github.com/EmbarkStudios/rust-ecosystem/issues/59>
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::float_cmp_const,
    clippy::fn_params_excessive_bools,
    clippy::if_let_mutex,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::linkedlist,
    clippy::lossy_float_literal,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_on_vec_items,
    clippy::match_same_arms,
    clippy::match_wildcard_for_single_variants,
    clippy::mem_forget,
    clippy::mismatched_target_os,
    clippy::mut_mut,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::path_buf_push_overwrite,
    clippy::ptr_as_ptr,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_functions_in_if_condition,
    clippy::semicolon_if_nothing_returned,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_to_string,
    clippy::todo,
    clippy::trait_duplication_in_bounds,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::useless_transmute,
    clippy::verbose_file_reads,
    clippy::zero_sized_map_values,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]
// END - Embark standard lints v0.4

//! `deep-dream` is a light API for multi-scale gradient ascent image synthesis, better known as
//! "deep dream".
//!
//! Given a seed image and a layer of a network, the image is repeatedly nudged in the direction
//! that increases the layer's mean activation, which amplifies whatever patterns the layer
//! responds to. The ascent runs over an octave pyramid, coarse to fine, so patterns show up at
//! several spatial scales.
//!
//! Images are processed in pairs, nominally the right and left views of a stereo pair. The right
//! (primary) image drives the gradient, and the left (companion) image receives exactly the same
//! updates.
//!
//! The network itself is abstracted behind the `GradientProvider` trait. `FilterBank` is a
//! provider built from fixed Gabor filters, which needs no trained weights.
//!
//! ## Usage
//! `Session` follows a "builder pattern" for defining parameters, meaning you chain functions
//! together.
//!
//! ```no_run
//! // Create a new session with default parameters
//! let session = deep_dream::Session::builder(deep_dream::FilterBank::default())
//!     // Set some parameters
//!     .seed(10)
//!     .iterations(10)
//!     // Build the session
//!     .build().expect("failed to build session");
//!
//! // Pair up the images of two directories
//! let batch = deep_dream::Batch::from_dirs("imgs/right", "imgs/left", "out/right", "out/left")
//!     .expect("failed to list input images");
//!
//! // Dream every pair and save the results
//! session.run(&batch, None).expect("failed to dream");
//! ```
mod dream;
mod errors;
mod filters;
mod img_pyramid;
mod provider;
mod selection;
pub mod session;
mod tiling;
mod utils;

pub use image;
pub use ndarray;

pub use dream::{DreamParams, Dreamer, StepUpdate};
pub use errors::Error;
pub use filters::FilterBank;
pub use img_pyramid::{Octave, OctavePyramid};
pub use provider::{GradientProvider, Layer};
pub use selection::LayerSelection;
pub use session::{
    Batch, BatchPair, DreamProgress, DreamReport, DreamUpdate, DreamedPair, ProgressStat,
    ProgressUpdate, Session, SessionBuilder,
};
pub use tiling::{tile_origins, TiledGradient};
pub use utils::{
    blur, load_dynamic_image, load_image, resize_to, roll, save_image, scaled_dims, std_dev,
    to_rgb_image, ImageSource,
};

/// A `height x width x 3` image of unbounded floating point samples.
///
/// Loaded images use the 0-255 range, but values are free to leave it while
/// dreaming; they are only clamped when saved.
pub type Image = ndarray::Array3<f32>;

#[derive(Default)]
struct Parameters {
    dream: DreamParams,
    selection: LayerSelection,
    seed: u64,
    max_thread_count: Option<usize>,
    chain_companion: bool,
}
