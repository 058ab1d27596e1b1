//! # voxelview
//!
//! The computational core of a volumetric medical image viewer: it turns a
//! sequence of independently decoded 2D slices into a coherent 3D scalar
//! field and renders that field interactively.
//!
//! Decoding of the source image format is an external collaborator supplied
//! through the [`FrameDecoder`] trait; this crate consumes already decoded
//! 16-bit frames plus their geometric metadata. On top of those it provides:
//!
//!  - Volume assembly: sorting slices by Z position (or instance ordinal),
//!    validating dimensions, deriving voxel spacing, and copying into one
//!    contiguous slice-major buffer.
//!  - Trilinear scalar-field sampling with rescale slope/intercept and
//!    window/level normalization.
//!  - Orthogonal slice rendering in the Axial, Coronal and Sagittal planes,
//!    with an optional crosshair overlay.
//!  - Ray-marched orthographic projections: maximum/minimum/average
//!    intensity and front-to-back compositing with transfer-function
//!    presets and early ray termination.
//!  - A byte-budgeted LRU decode cache plus a cancellable, direction-biased
//!    prefetcher that keep single-slice scrolling smooth.
//!
//! # Examples
//!
//! Assemble a volume from decoded slices and render the center axial plane:
//!
//! ```no_run
//! # use voxelview::assembler::{SliceSource, VolumeAssembler};
//! # use voxelview::enums::Plane;
//! # let sources: Vec<SliceSource> = Vec::new();
//! let volume = VolumeAssembler::assemble(sources, |done, total| {
//!     eprintln!("{done}/{total}");
//! })
//! .expect("should have assembled the series");
//! let window = volume.window();
//! let image = volume
//!     .render_plane(Plane::Axial, 0.5, &window, 512, 512)
//!     .expect("should have rendered the center slice");
//! image.save("axial.png").unwrap();
//! ```

pub mod assembler;
pub mod cache;
pub mod enums;
pub mod frame;
pub mod prefetch;
pub mod projection;
pub mod transfer;
pub mod volume;

pub use assembler::{SliceSource, VolumeAssembler, VolumeLoadError};
pub use cache::{CacheKey, FrameCache};
pub use enums::{Plane, RenderMode, TransferPreset};
pub use frame::{DecodeError, DecodedFrame, FrameDecoder, SlicePosition, WindowLevel};
pub use prefetch::Prefetcher;
pub use projection::{ProjectionParams, project_pixel, render_projection};
pub use volume::VolumeField;
