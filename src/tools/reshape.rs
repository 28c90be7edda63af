//! Reshaping of the higher dimensions.

use log::{debug, warn};
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex32;

use crate::definitions::DimensionTag;
use crate::error::{NiftiMrsError, Result};
use crate::hdr_ext::{DimensionInfo, MAX_HIGHER_DIMS};
use crate::object::NiftiMrs;

/// Resolve a requested shape with at most one `-1` entry against the
/// total number of elements.
fn resolve_shape(requested: &[isize], total: usize) -> Result<Vec<usize>> {
    let wildcards = requested.iter().filter(|&&s| s == -1).count();
    if wildcards > 1 {
        return Err(NiftiMrsError::ShapeMismatch(format!(
            "only one dimension of {:?} can be inferred",
            requested
        )));
    }
    if let Some(bad) = requested.iter().find(|&&s| s == 0 || s < -1) {
        return Err(NiftiMrsError::InvalidArgument(format!(
            "dimension size must be positive or -1, not {}",
            bad
        )));
    }
    let known: usize = requested
        .iter()
        .filter(|&&s| s > 0)
        .map(|&s| s as usize)
        .product();
    let inferred = if wildcards == 1 {
        if total % known != 0 {
            return Err(NiftiMrsError::ShapeMismatch(format!(
                "{} elements cannot be arranged into {:?}",
                total, requested
            )));
        }
        total / known
    } else {
        if known != total {
            return Err(NiftiMrsError::ShapeMismatch(format!(
                "{} elements cannot be arranged into {:?}",
                total, requested
            )));
        }
        0
    };
    Ok(requested
        .iter()
        .map(|&s| if s == -1 { inferred } else { s as usize })
        .collect())
}

/// Reshape the higher dimensions (in row-major order) to `shape`, one
/// entry of which may be `-1` to be inferred.
///
/// `tags` gives the tag of each new higher dimension; where an entry is
/// missing the existing tag of that dimension is kept. Per-index headers
/// of dimensions whose size or position changes are dropped.
pub fn reshape(
    obj: &NiftiMrs,
    shape: &[isize],
    tags: &[Option<DimensionTag>],
) -> Result<NiftiMrs> {
    if shape.len() > MAX_HIGHER_DIMS {
        return Err(NiftiMrsError::InvalidArgument(format!(
            "at most {} higher dimensions are allowed, got {}",
            MAX_HIGHER_DIMS,
            shape.len()
        )));
    }
    if let Some(slot) = (shape.len()..tags.len()).find(|&s| tags[s].is_some()) {
        return Err(NiftiMrsError::InvalidArgument(format!(
            "a tag was given for dim_{} but the new shape has {} dimensions",
            slot + 5,
            shape.len() + 4
        )));
    }

    let data = obj.padded_data();
    let old_shape = data.shape().to_vec();
    let old_higher = &old_shape[4..];
    let new_higher = resolve_shape(shape, old_higher.iter().product())?;
    let unchanged = old_higher
        .iter()
        .zip(&new_higher)
        .take_while(|(a, b)| a == b)
        .count();

    let mut hdr_ext = obj.hdr_ext().clone();
    for slot in 0..MAX_HIGHER_DIMS {
        let current = obj.hdr_ext().dim_infos()[slot].clone();
        let given = tags.get(slot).copied().flatten();
        if slot >= new_higher.len() {
            hdr_ext.replace_dim_slot(slot, DimensionInfo::default())?;
        } else if let Some(tag) = given {
            hdr_ext.set_dim_info(slot, tag, None, None)?;
        } else if current.tag.is_none() {
            return Err(NiftiMrsError::MissingDimensionTag(slot + 4));
        }

        if current.header.is_some() && (slot >= unchanged || given.is_some()) {
            warn!(
                "dropping the per-index header of dim_{} as the dimension is reshaped",
                slot + 5
            );
            hdr_ext.replace_dim_header(slot, None)?;
        }
    }

    let mut full_shape = old_shape[..4].to_vec();
    full_shape.extend(&new_higher);
    debug!("reshaping {:?} to {:?}", old_shape, full_shape);
    let elements: Vec<Complex32> = data.iter().cloned().collect();
    let data = ArrayD::from_shape_vec(IxDyn(&full_shape), elements)
        .map_err(|e| NiftiMrsError::ShapeMismatch(e.to_string()))?;
    obj.with_parts(data, hdr_ext)
}
