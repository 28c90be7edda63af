//! Splitting an object in two along a higher dimension, and merging
//! objects back together.

use log::debug;
use ndarray::{concatenate, ArrayD, Axis};
use num_complex::Complex32;

use crate::dim_header::DimensionHeader;
use crate::error::{NiftiMrsError, Result};
use crate::hdr_ext::{HeaderExtension, MAX_HIGHER_DIMS};
use crate::object::{DimRef, NiftiMrs};

/// Which indices of the split dimension go to which output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitSelector {
    /// Indices `0..=k` go to the first output and the rest to the second.
    At(usize),
    /// The given indices go to the second output, in the given order,
    /// and the remaining ones to the first.
    Indices(Vec<usize>),
}

impl From<usize> for SplitSelector {
    fn from(index: usize) -> Self {
        SplitSelector::At(index)
    }
}

impl From<Vec<usize>> for SplitSelector {
    fn from(indices: Vec<usize>) -> Self {
        SplitSelector::Indices(indices)
    }
}

impl SplitSelector {
    /// Partition the indices of a dimension of the given size.
    fn partition(&self, size: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        match self {
            SplitSelector::At(k) => {
                if size < 2 || *k > size - 2 {
                    return Err(NiftiMrsError::IndexOutOfRange(*k, size));
                }
                Ok(((0..=*k).collect(), (*k + 1..size).collect()))
            }
            SplitSelector::Indices(selected) => {
                if let Some(&i) = selected.iter().find(|&&i| i >= size) {
                    return Err(NiftiMrsError::IndexOutOfRange(i, size));
                }
                let others: Vec<usize> = (0..size).filter(|i| !selected.contains(i)).collect();
                if selected.is_empty() || others.is_empty() {
                    return Err(NiftiMrsError::InvalidArgument(
                        "splitting must leave at least one index in each output".to_owned(),
                    ));
                }
                Ok((others, selected.clone()))
            }
        }
    }
}

fn select_header(
    hdr_ext: &HeaderExtension,
    slot: usize,
    size: usize,
    indices: &[usize],
) -> Result<HeaderExtension> {
    let mut out = hdr_ext.clone();
    if let Some(header) = hdr_ext.dim_info(slot).and_then(|d| d.header.as_ref()) {
        let selected = header
            .iter()
            .map(|(key, value)| Ok((key.clone(), value.select(size, indices)?)))
            .collect::<Result<DimensionHeader>>()?;
        out.replace_dim_header(slot, Some(selected))?;
    }
    Ok(out)
}

/// Split an object in two along a higher dimension.
///
/// Per-index headers of the split dimension are partitioned like the
/// data, other dimensions are copied into both outputs.
pub fn split<D, S>(obj: &NiftiMrs, dim: D, selector: S) -> Result<(NiftiMrs, NiftiMrs)>
where
    D: Into<DimRef>,
    S: Into<SplitSelector>,
{
    let axis = obj.resolve_dim(dim.into())?;
    let data = obj.padded_data();
    let size = data.len_of(Axis(axis));
    let (first, second) = selector.into().partition(size)?;
    debug!(
        "splitting axis {} of size {} into {} and {} elements",
        axis,
        size,
        first.len(),
        second.len()
    );

    let slot = axis - 4;
    let hdr_first = select_header(obj.hdr_ext(), slot, size, &first)?;
    let hdr_second = select_header(obj.hdr_ext(), slot, size, &second)?;
    Ok((
        obj.with_parts(data.select(Axis(axis), &first), hdr_first)?,
        obj.with_parts(data.select(Axis(axis), &second), hdr_second)?,
    ))
}

/// First key at which two dimension headers differ.
fn header_mismatch(a: &DimensionHeader, b: &DimensionHeader) -> Option<String> {
    a.iter()
        .find(|(k, v)| b.get(*k) != Some(*v))
        .map(|(k, _)| k.clone())
        .or_else(|| b.keys().find(|k| !a.contains_key(*k)).cloned())
}

fn merge_headers(
    acc: Option<DimensionHeader>,
    acc_size: usize,
    other: Option<&DimensionHeader>,
    other_size: usize,
    slot: usize,
) -> Result<Option<DimensionHeader>> {
    match (acc, other) {
        (None, None) => Ok(None),
        (Some(acc), Some(other)) => {
            if acc.len() != other.len() || acc.keys().any(|k| !other.contains_key(k)) {
                return Err(NiftiMrsError::TagMismatch(format!(
                    "dim_{}_header keys differ between inputs",
                    slot + 5
                )));
            }
            acc.iter()
                .map(|(key, value)| {
                    let merged = value.concat(acc_size, &other[key], other_size)?;
                    Ok((key.clone(), merged))
                })
                .collect::<Result<DimensionHeader>>()
                .map(Some)
        }
        _ => Err(NiftiMrsError::TagMismatch(format!(
            "dim_{}_header is only present in some inputs",
            slot + 5
        ))),
    }
}

/// Concatenate two or more objects along a higher dimension, in order.
///
/// All inputs must share dimension tags, the sizes of every other
/// dimension and the per-index headers of every other dimension.
pub fn merge<D: Into<DimRef>>(objs: &[NiftiMrs], dim: D) -> Result<NiftiMrs> {
    if objs.len() < 2 {
        return Err(NiftiMrsError::InvalidArgument(format!(
            "at least two objects are needed to merge, got {}",
            objs.len()
        )));
    }
    let first = &objs[0];
    let axis = first.resolve_dim(dim.into())?;
    let slot = axis - 4;
    let tags = first.dim_tags();
    for (i, obj) in objs.iter().enumerate().skip(1) {
        if obj.dim_tags() != tags {
            return Err(NiftiMrsError::TagMismatch(format!(
                "input {} has dimension tags {:?}, input 0 has {:?}",
                i,
                obj.dim_tags(),
                tags
            )));
        }
    }

    for slot in 0..MAX_HIGHER_DIMS {
        let info = |obj: &NiftiMrs| obj.hdr_ext().dim_info(slot).and_then(|d| d.info.clone());
        let reference = info(first);
        if let Some(i) = (1..objs.len()).find(|&i| info(&objs[i]) != reference) {
            return Err(NiftiMrsError::TagMismatch(format!(
                "dim_{}_info differs between input 0 and input {}",
                slot + 5,
                i
            )));
        }
    }

    let ndim = objs.iter().map(NiftiMrs::ndim).max().unwrap_or(4);
    let datas: Vec<ArrayD<Complex32>> = objs
        .iter()
        .map(|obj| {
            let mut data = obj.padded_data();
            while data.ndim() < ndim {
                let axis = data.ndim();
                data = data.insert_axis(Axis(axis));
            }
            data
        })
        .collect();
    let reference = datas[0].shape();
    for (i, data) in datas.iter().enumerate().skip(1) {
        let mismatch = (0..ndim).find(|&ax| ax != axis && data.shape()[ax] != reference[ax]);
        if let Some(ax) = mismatch {
            return Err(NiftiMrsError::ShapeMismatch(format!(
                "input {} differs from input 0 on axis {}: {:?} vs {:?}",
                i,
                ax,
                data.shape(),
                reference
            )));
        }
    }

    let mut hdr_ext = first.hdr_ext().clone();
    for other_slot in (0..MAX_HIGHER_DIMS).filter(|&s| s != slot) {
        let reference = first.hdr_ext().dim_info(other_slot).and_then(|d| d.header.as_ref());
        for (i, obj) in objs.iter().enumerate().skip(1) {
            let header = obj.hdr_ext().dim_info(other_slot).and_then(|d| d.header.as_ref());
            let mismatch = match (reference, header) {
                (Some(a), Some(b)) => header_mismatch(a, b),
                (Some(a), None) | (None, Some(a)) => a.keys().next().cloned(),
                (None, None) => None,
            };
            if let Some(key) = mismatch {
                return Err(NiftiMrsError::TagMismatch(format!(
                    "`{}` in dim_{}_header differs between input 0 and input {}",
                    key,
                    other_slot + 5,
                    i
                )));
            }
        }
    }

    let mut merged = first.hdr_ext().dim_info(slot).and_then(|d| d.header.clone());
    let mut merged_size = datas[0].len_of(Axis(axis));
    for (obj, data) in objs.iter().zip(&datas).skip(1) {
        let size = data.len_of(Axis(axis));
        let header = obj.hdr_ext().dim_info(slot).and_then(|d| d.header.as_ref());
        merged = merge_headers(merged, merged_size, header, size, slot)?;
        merged_size += size;
    }
    hdr_ext.replace_dim_header(slot, merged)?;

    let views: Vec<_> = datas.iter().map(|d| d.view()).collect();
    let data = concatenate(Axis(axis), &views)
        .map_err(|e| NiftiMrsError::ShapeMismatch(e.to_string()))?;
    debug!(
        "merged {} objects along axis {} into shape {:?}",
        objs.len(),
        axis,
        data.shape()
    );
    first.with_parts(data, hdr_ext)
}
