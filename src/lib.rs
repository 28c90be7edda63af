//! Rust implementation of NIfTI-MRS, the NIfTI-based format for magnetic
//! resonance spectroscopy data.
//!
//! A NIfTI-MRS file holds complex time-domain data with 4 to 7 dimensions
//! (3 spatial, 1 spectral and up to 3 higher dimensions) and a JSON header
//! extension which tags each higher dimension and carries acquisition
//! metadata. This crate models the header extension, validates it, and
//! provides tools to split, merge, reorder and reshape the higher
//! dimensions while keeping the metadata consistent with the data.
//!
//! File reading and writing is delegated to the [`nifti`] crate.
#![recursion_limit = "256"]
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use] extern crate quick_error;

pub mod affine;
pub mod definitions;
pub mod dim_header;
pub mod error;
pub mod extension;
pub mod hdr_ext;
pub mod object;
pub mod tools;
pub mod validator;

pub use definitions::{DimensionTag, Definitions, NIFTI_MRS_VERSION};
pub use dim_header::{DimensionHeader, HeaderValue};
pub use error::{NiftiMrsError, Result};
pub use hdr_ext::{DimensionInfo, HeaderExtension, HeaderValueKind};
pub use object::{DimRef, NiftiMrs, ValidationMode};
pub use tools::SplitSelector;
pub use validator::{validate_hdr_ext, Validator};
