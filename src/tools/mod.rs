//! Transformations of NIfTI-MRS objects along the higher dimensions.
//!
//! Every tool takes its inputs by reference and returns new, validated
//! objects, carrying out on the tags and per-index headers the same
//! operation done on the data.

use log::debug;
use ndarray::Axis;

use crate::error::Result;
use crate::object::{DimRef, NiftiMrs};

mod reorder;
mod reshape;
mod split_merge;

pub use self::reorder::reorder;
pub use self::reshape::reshape;
pub use self::split_merge::{merge, split, SplitSelector};

/// Drop a higher dimension, keeping the data at index 0 of it.
///
/// Later dimensions move down by one.
pub fn remove_dim<D: Into<DimRef>>(obj: &NiftiMrs, dim: D) -> Result<NiftiMrs> {
    let axis = obj.resolve_dim(dim.into())?;
    debug!("removing axis {}", axis);
    let data = obj.padded_data().index_axis_move(Axis(axis), 0);
    let mut hdr_ext = obj.hdr_ext().clone();
    hdr_ext.remove_dim_info(axis - 4)?;
    obj.with_parts(data, hdr_ext)
}

/// Complex conjugate of the data.
pub fn conjugate(obj: &NiftiMrs) -> NiftiMrs {
    obj.map_data(|c| c.conj())
}
