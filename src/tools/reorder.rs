//! Reordering of the higher dimensions.

use log::debug;
use ndarray::{Axis, IxDyn};

use crate::definitions::DimensionTag;
use crate::error::{NiftiMrsError, Result};
use crate::hdr_ext::{DimensionInfo, MAX_HIGHER_DIMS};
use crate::object::NiftiMrs;

/// Check a desired tag order and pad it to three entries.
fn normalize_order(order: &[Option<DimensionTag>]) -> Result<[Option<DimensionTag>; MAX_HIGHER_DIMS]> {
    if order.len() > MAX_HIGHER_DIMS {
        return Err(NiftiMrsError::InvalidArgument(format!(
            "at most {} dimension tags can be given, got {}",
            MAX_HIGHER_DIMS,
            order.len()
        )));
    }
    let mut padded = [None; MAX_HIGHER_DIMS];
    padded[..order.len()].copy_from_slice(order);

    for (i, tag) in padded.iter().enumerate() {
        if let Some(tag) = tag {
            if padded[..i].contains(&Some(*tag)) {
                return Err(NiftiMrsError::InvalidArgument(format!(
                    "tag {} appears more than once",
                    tag
                )));
            }
            if padded[..i].contains(&None) {
                return Err(NiftiMrsError::InvalidArgument(
                    "an unset dimension cannot precede a tagged one".to_owned(),
                ));
            }
        }
    }
    Ok(padded)
}

/// Rearrange the higher dimensions to follow the given tag order.
///
/// Every tag of the object must be in `order`. Tags of `order` which the
/// object does not have are added as new dimensions of size 1. Tags move
/// together with their annotation and per-index header.
pub fn reorder(obj: &NiftiMrs, order: &[Option<DimensionTag>]) -> Result<NiftiMrs> {
    let order = normalize_order(order)?;
    let current = obj.dim_tags();
    if let Some(missing) = current.iter().flatten().find(|t| !order.contains(&Some(**t))) {
        return Err(NiftiMrsError::IncompatibleTags(format!(
            "{} is not in the new order {:?}",
            missing, order
        )));
    }

    let mut data = obj.padded_data();
    while data.ndim() < 4 + MAX_HIGHER_DIMS {
        let axis = data.ndim();
        data = data.insert_axis(Axis(axis));
    }

    // axes of unused slots have size 1 and stand in for new dimensions
    let mut spare = (0..MAX_HIGHER_DIMS).filter(|&s| current[s].is_none());
    let mut permutation: Vec<usize> = (0..4).collect();
    let mut hdr_ext = obj.hdr_ext().clone();
    for (slot, tag) in order.iter().enumerate() {
        let source = tag.and_then(|t| current.iter().position(|c| *c == Some(t)));
        let (source, info) = match (source, tag) {
            (Some(s), _) => (s, obj.hdr_ext().dim_infos()[s].clone()),
            (None, Some(t)) => (spare.next().unwrap_or(slot), DimensionInfo::tagged(*t)),
            (None, None) => (spare.next().unwrap_or(slot), DimensionInfo::default()),
        };
        permutation.push(source + 4);
        hdr_ext.replace_dim_slot(slot, info)?;
    }
    debug!("reordering higher dimensions with axis permutation {:?}", permutation);

    let mut data = data.permuted_axes(IxDyn(&permutation));
    let ndim = hdr_ext.ndim();
    while data.ndim() > ndim {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }
    obj.with_parts(data, hdr_ext)
}
