//! Module for handling complete NIfTI-MRS objects: the complex data array,
//! the NIfTI header with its affine transformation, and the header
//! extension.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ndarray::{indices, ArrayD, Axis, IxDyn};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, NiftiType, ReaderOptions};
use num_complex::Complex32;
use serde_json::{Map, Value};

use crate::affine::{
    affine_from_header, default_affine, set_header_affine, Affine4, XFORM_ALIGNED,
};
use crate::definitions::{
    is_required, DimensionTag, Definitions, NIFTI_MRS_VERSION, NIFTI_UNITS_MM, NIFTI_UNITS_SEC,
    RESONANT_NUCLEUS, SPECTROMETER_FREQUENCY,
};
use crate::dim_header::DimensionHeader;
use crate::error::{NiftiMrsError, Result};
use crate::extension::{decode, extension_sequence, find_mrs_extension};
use crate::hdr_ext::{parse_dim_key, HeaderExtension};
use crate::validator::{
    inferred_dimensions, intent_name, parse_intent_version, validate_nifti_data,
    validate_nifti_header, Validator,
};

/// How validation failures are handled when loading a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Loading fails on any validation error.
    Strict,
    /// Validation errors are logged as warnings and loading proceeds.
    Soft,
}

impl Default for ValidationMode {
    fn default() -> Self {
        ValidationMode::Strict
    }
}

/// Reference to one of the higher dimensions, by tag or by 0-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimRef {
    /// The dimension with this tag.
    Tag(DimensionTag),
    /// The dimension at this index (4 to 6).
    Index(usize),
}

impl From<DimensionTag> for DimRef {
    fn from(tag: DimensionTag) -> Self {
        DimRef::Tag(tag)
    }
}

impl From<usize> for DimRef {
    fn from(index: usize) -> Self {
        DimRef::Index(index)
    }
}

/// Convert a spectrometer frequency to MHz, assuming that values of
/// 1e5 or more were given in Hz.
pub fn frequency_in_mhz(frequency: f64) -> f64 {
    if frequency < 1e5 {
        frequency
    } else {
        frequency / 1e6
    }
}

fn intent_bytes(version: (u32, u32)) -> [u8; 16] {
    let mut intent = [0u8; 16];
    let name = format!("mrs_v{}_{}", version.0, version.1);
    for (dst, src) in intent.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    intent
}

/// Number of dimensions once trailing singleton higher dimensions are dropped.
fn squeezed_rank(shape: &[usize]) -> usize {
    let mut rank = shape.len();
    while rank > 4 && shape[rank - 1] == 1 {
        rank -= 1;
    }
    rank
}

fn pad_shape(shape: &[usize], ndim: usize) -> Vec<usize> {
    let mut shape = shape.to_vec();
    if shape.len() < ndim {
        shape.resize(ndim, 1);
    }
    shape
}

/// Check a header extension in JSON form against a data shape.
fn check_hdr_ext(value: &Value, shape: &[usize]) -> Result<()> {
    let data_dimensions = squeezed_rank(shape).max(inferred_dimensions(value));
    Validator::default().validate_value(value, &pad_shape(shape, data_dimensions), Some(data_dimensions))
}

/// Set the dimensions of a NIfTI header to the given data shape.
fn set_header_dims(header: &mut NiftiHeader, shape: &[usize]) -> Result<()> {
    validate_nifti_data(shape)?;
    header.dim = [1; 8];
    header.dim[0] = shape.len() as u16;
    for (i, &size) in shape.iter().enumerate() {
        if size > usize::from(u16::max_value()) {
            return Err(NiftiMrsError::InvalidData(format!(
                "dimension {} of size {} cannot be stored in a NIfTI-1 header",
                i, size
            )));
        }
        header.dim[i + 1] = size as u16;
    }
    Ok(())
}

/// A NIfTI-MRS object held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiMrs {
    data: ArrayD<Complex32>,
    header: NiftiHeader,
    affine: Affine4,
    hdr_ext: HeaderExtension,
    filename: Option<PathBuf>,
}

impl NiftiMrs {
    /// Create an object out of complex data with 4 to 7 dimensions, the
    /// dwell time in seconds and a header extension.
    ///
    /// The default NIfTI-MRS affine is used if none is given.
    pub fn new(
        data: ArrayD<Complex32>,
        dwelltime: f64,
        hdr_ext: HeaderExtension,
        affine: Option<Affine4>,
    ) -> Result<Self> {
        let affine = affine.unwrap_or_else(default_affine);
        let mut header = NiftiHeader {
            datatype: NiftiType::Complex64 as i16,
            bitpix: 64,
            intent_name: intent_bytes(NIFTI_MRS_VERSION),
            xyzt_units: NIFTI_UNITS_MM | NIFTI_UNITS_SEC,
            scl_slope: 1.0,
            scl_inter: 0.0,
            sform_code: XFORM_ALIGNED,
            qform_code: XFORM_ALIGNED,
            ..NiftiHeader::default()
        };
        set_header_dims(&mut header, data.shape())?;
        set_header_affine(&mut header, &affine);
        header.pixdim[4] = dwelltime as f32;
        NiftiMrs::from_parts(data, header, hdr_ext)
    }

    /// Create an object from data and the required metadata, tagging the
    /// higher dimensions with `dim_tags` or, where not given, with the
    /// default tags.
    ///
    /// Spectrometer frequencies of 1e5 or more are taken to be in Hz.
    pub fn generate<S: AsRef<str>>(
        data: ArrayD<Complex32>,
        dwelltime: f64,
        spec_frequency: &[f64],
        resonant_nucleus: &[S],
        affine: Option<Affine4>,
        dim_tags: &[Option<DimensionTag>],
    ) -> Result<Self> {
        validate_nifti_data(data.shape())?;
        let frequencies: Vec<f64> = spec_frequency.iter().map(|&f| frequency_in_mhz(f)).collect();
        let mut hdr_ext = HeaderExtension::new(&frequencies, resonant_nucleus, None)?;
        for slot in 0..3 {
            let tag = dim_tags.get(slot).copied().flatten();
            match tag {
                Some(tag) => hdr_ext.set_dim_info(slot, tag, None, None)?,
                None if slot + 4 < data.ndim() => {
                    hdr_ext.set_dim_info(slot, DimensionTag::DEFAULTS[slot], None, None)?
                }
                None => {}
            }
        }
        NiftiMrs::new(data, dwelltime, hdr_ext, affine)
    }

    /// Assemble an object out of its parts, validating them.
    pub fn from_parts(
        data: ArrayD<Complex32>,
        header: NiftiHeader,
        hdr_ext: HeaderExtension,
    ) -> Result<Self> {
        validate_nifti_data(data.shape())?;
        validate_nifti_header(&header)?;
        check_hdr_ext(&hdr_ext.to_value(), data.shape())?;
        let affine = affine_from_header(&header);
        Ok(NiftiMrs {
            data,
            header,
            affine,
            hdr_ext,
            filename: None,
        })
    }

    /// Load a NIfTI-MRS file, failing on any validation error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        NiftiMrs::load_with(path, ValidationMode::Strict)
    }

    /// Load a NIfTI-MRS file with the given validation mode.
    pub fn load_with<P: AsRef<Path>>(path: P, mode: ValidationMode) -> Result<Self> {
        let path = path.as_ref();
        let obj = ReaderOptions::new().read_file(path)?;
        let header = obj.header().clone();

        let intent = intent_name(&header);
        if parse_intent_version(&intent).is_none() {
            return Err(NiftiMrsError::NotNiftiMrs(format!(
                "intent name `{}` does not identify a NIfTI-MRS file",
                intent
            )));
        }
        let json = find_mrs_extension(obj.extensions())
            .ok_or_else(|| {
                NiftiMrsError::NotNiftiMrs("no header extension with code 44".to_owned())
            })
            .and_then(decode)?;
        let value: Value = serde_json::from_str(&json).map_err(NiftiMrsError::NotJson)?;
        let data = obj.into_volume().into_ndarray::<Complex32>()?;

        let validation = validate_nifti_data(data.shape())
            .and_then(|_| validate_nifti_header(&header))
            .and_then(|_| check_hdr_ext(&value, data.shape()));
        if let Err(e) = validation {
            match mode {
                ValidationMode::Strict => return Err(e),
                ValidationMode::Soft => warn!("{}: {}", path.display(), e),
            }
        }

        let hdr_ext = HeaderExtension::from_value(&value)?;
        let affine = affine_from_header(&header);
        info!(
            "loaded {} with shape {:?} and tags {:?}",
            path.display(),
            data.shape(),
            hdr_ext.dim_tags()
        );
        Ok(NiftiMrs {
            data,
            header,
            affine,
            hdr_ext,
            filename: Some(path.to_path_buf()),
        })
    }

    /// Validate and write the object to a file, returning the path written.
    ///
    /// `.nii.gz` is appended if the path does not end with `.nii` or `.nii.gz`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        self.validate()?;
        let path = with_nifti_extension(path.as_ref());

        let data = self.padded_data();
        let mut header = self.header.clone();
        set_header_dims(&mut header, data.shape())?;
        set_header_affine(&mut header, &self.affine);
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;

        WriterOptions::new(&path)
            .reference_header(&header)
            .with_extensions(extension_sequence(&self.hdr_ext))
            .write_nifti(&data)?;
        info!("saved {}", path.display());
        Ok(path)
    }

    /// Check the data, NIfTI header and header extension.
    pub fn validate(&self) -> Result<()> {
        validate_nifti_data(self.data.shape())?;
        validate_nifti_header(&self.header)?;
        check_hdr_ext(&self.hdr_ext.to_value(), self.data.shape())
    }

    /// Build a new object with the header and affine of `self`.
    pub(crate) fn with_parts(&self, data: ArrayD<Complex32>, hdr_ext: HeaderExtension) -> Result<Self> {
        let mut header = self.header.clone();
        set_header_dims(&mut header, data.shape())?;
        check_hdr_ext(&hdr_ext.to_value(), data.shape())?;
        Ok(NiftiMrs {
            data,
            header,
            affine: self.affine,
            hdr_ext,
            filename: None,
        })
    }

    /// Build a new object with every data element mapped through `f`.
    pub(crate) fn map_data<F>(&self, f: F) -> Self
    where
        F: FnMut(Complex32) -> Complex32,
    {
        NiftiMrs {
            data: self.data.mapv(f),
            header: self.header.clone(),
            affine: self.affine,
            hdr_ext: self.hdr_ext.clone(),
            filename: None,
        }
    }

    /// The data array as stored.
    pub fn data(&self) -> &ArrayD<Complex32> {
        &self.data
    }

    /// Move the data array out of the object.
    pub fn into_data(self) -> ArrayD<Complex32> {
        self.data
    }

    /// A copy of the data with trailing singleton dimensions added up to `ndim`.
    pub fn padded_data(&self) -> ArrayD<Complex32> {
        let mut data = self.data.clone();
        while data.ndim() < self.ndim() {
            let axis = data.ndim();
            data = data.insert_axis(Axis(axis));
        }
        data
    }

    /// Number of dimensions, at least 4.
    pub fn ndim(&self) -> usize {
        self.data.ndim().max(self.hdr_ext.ndim()).max(4)
    }

    /// Shape of the data, padded with singleton dimensions up to `ndim`.
    pub fn shape(&self) -> Vec<usize> {
        pad_shape(self.data.shape(), self.ndim())
    }

    /// Tags of the 5th, 6th and 7th dimensions.
    pub fn dim_tags(&self) -> [Option<DimensionTag>; 3] {
        self.hdr_ext.dim_tags()
    }

    /// Index (4 to 6) of the dimension with the given tag.
    pub fn dim_position(&self, tag: DimensionTag) -> Result<usize> {
        self.dim_tags()
            .iter()
            .position(|t| *t == Some(tag))
            .map(|slot| slot + 4)
            .ok_or_else(|| NiftiMrsError::DimensionNotFound(tag.to_string()))
    }

    /// Resolve a reference to an existing higher dimension into its index.
    pub fn resolve_dim(&self, dim: DimRef) -> Result<usize> {
        match dim {
            DimRef::Tag(tag) => self.dim_position(tag),
            DimRef::Index(index) if index >= 4 && index < self.ndim() => Ok(index),
            DimRef::Index(index) => Err(NiftiMrsError::InvalidDimension(index, self.ndim())),
        }
    }

    /// The NIfTI header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// The header extension.
    pub fn hdr_ext(&self) -> &HeaderExtension {
        &self.hdr_ext
    }

    /// The affine transformation from voxel to world coordinates.
    pub fn affine(&self) -> &Affine4 {
        &self.affine
    }

    /// Replace the affine transformation.
    pub fn set_affine(&mut self, affine: Affine4) {
        set_header_affine(&mut self.header, &affine);
        self.affine = affine;
    }

    /// The file this object was loaded from, if any.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Dwell time in seconds.
    pub fn dwelltime(&self) -> f64 {
        f64::from(self.header.pixdim[4])
    }

    /// Set the dwell time in seconds.
    pub fn set_dwelltime(&mut self, dwelltime: f64) -> Result<()> {
        if !(dwelltime > 0.0 && dwelltime <= 1.0) {
            return Err(NiftiMrsError::InvalidArgument(format!(
                "dwell time ({}) is unrealistic",
                dwelltime
            )));
        }
        self.header.pixdim[4] = dwelltime as f32;
        Ok(())
    }

    /// Spectral width in Hz.
    pub fn spectral_width(&self) -> f64 {
        1.0 / self.dwelltime()
    }

    /// Receiver bandwidth in Hz, equal to the spectral width.
    pub fn bandwidth(&self) -> f64 {
        self.spectral_width()
    }

    /// Resonant nuclei.
    pub fn nucleus(&self) -> &[String] {
        self.hdr_ext.resonant_nucleus()
    }

    /// Spectrometer frequencies in MHz.
    pub fn spectrometer_frequency(&self) -> &[f64] {
        self.hdr_ext.spectrometer_frequency()
    }

    /// NIfTI-MRS version declared by the intent name.
    pub fn nifti_mrs_version(&self) -> Result<(u32, u32)> {
        let intent = intent_name(&self.header);
        parse_intent_version(&intent).ok_or_else(|| {
            NiftiMrsError::InvalidNiftiHeader(format!(
                "intent name ({}) does not match \"mrs_vMajor_minor\"",
                intent
            ))
        })
    }

    /// Declare the given NIfTI-MRS version in the intent name.
    pub fn set_version_info(&mut self, major: u32, minor: u32) {
        self.header.intent_name = intent_bytes((major, minor));
    }

    /// Modify the header extension through `f`.
    ///
    /// The modified extension only replaces the current one if `f`
    /// succeeds and the result is valid for the data.
    pub fn update_header<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut HeaderExtension) -> Result<()>,
    {
        let mut hdr_ext = self.hdr_ext.clone();
        f(&mut hdr_ext)?;
        check_hdr_ext(&hdr_ext.to_value(), self.data.shape())?;
        self.hdr_ext = hdr_ext;
        Ok(())
    }

    /// Set the tag, annotation and per-index header of a higher dimension.
    ///
    /// Each per-index header list must have one entry per index of the dimension.
    pub fn set_dim_tag<D: Into<DimRef>>(
        &mut self,
        dim: D,
        tag: DimensionTag,
        info: Option<&str>,
        header: Option<DimensionHeader>,
    ) -> Result<()> {
        let index = match dim.into() {
            DimRef::Tag(existing) => self.dim_position(existing)?,
            DimRef::Index(index) if (4..7).contains(&index) => index,
            DimRef::Index(index) => return Err(NiftiMrsError::InvalidDimension(index, 7)),
        };
        let size = self.data.shape().get(index).copied().unwrap_or(1);
        if let Some(header) = &header {
            for (key, value) in header {
                if let Some(len) = value.explicit_len() {
                    if len != size {
                        return Err(NiftiMrsError::BadDynamicHeaderShape(key.clone(), size, len));
                    }
                }
            }
        }
        debug!("tagging dimension {} as {}", index, tag);
        self.update_header(|h| h.set_dim_info(index - 4, tag, info, header))
    }

    /// Add a field to the header extension.
    ///
    /// Required fields are replaced, standard-defined fields are set
    /// directly and any other key becomes a user-defined field, which
    /// needs a description.
    pub fn add_hdr_field(&mut self, key: &str, value: Value, doc: Option<&str>) -> Result<()> {
        if parse_dim_key(key).is_some() {
            return Err(NiftiMrsError::InvalidArgument(format!(
                "`{}` must be modified through `set_dim_tag`",
                key
            )));
        }
        self.update_header(|h| {
            if key == SPECTROMETER_FREQUENCY || key == RESONANT_NUCLEUS {
                let mut obj = h.to_value();
                if let Value::Object(map) = &mut obj {
                    let _ = map.insert(key.to_owned(), value);
                }
                *h = HeaderExtension::from_value(&obj)?;
                Ok(())
            } else if Definitions::nifti_mrs().is_standard(key) {
                h.set_standard_def(key, value)
            } else {
                let doc = doc.ok_or_else(|| {
                    NiftiMrsError::InvalidArgument(format!(
                        "user-defined field `{}` needs a description",
                        key
                    ))
                })?;
                h.set_user_def(key, value, doc)
            }
        })
    }

    /// Remove a standard-defined or user-defined field from the header extension.
    pub fn remove_hdr_field(&mut self, key: &str) -> Result<()> {
        if is_required(key) {
            return Err(NiftiMrsError::InvalidArgument(format!(
                "required field `{}` cannot be removed",
                key
            )));
        }
        if parse_dim_key(key).is_some() {
            return Err(NiftiMrsError::InvalidArgument(format!(
                "`{}` cannot be removed, remove the dimension instead",
                key
            )));
        }
        self.update_header(|h| {
            if Definitions::nifti_mrs().is_standard(key) {
                h.remove_standard_def(key).map(|_| ())
            } else {
                h.remove_user_def(key).map(|_| ())
            }
        })
    }

    /// Per-index header values for every combination of indices of the
    /// higher dimensions, as an array with the shape of those dimensions.
    pub fn dynamic_hdr_vals(&self) -> Result<ArrayD<Map<String, Value>>> {
        let shape = self.shape();
        let higher = &shape[4..];
        let mut expanded: Vec<Vec<(String, Vec<Value>)>> = Vec::with_capacity(higher.len());
        for (slot, &size) in higher.iter().enumerate() {
            let entries = match self.hdr_ext.dim_info(slot).and_then(|d| d.header.as_ref()) {
                Some(header) => header
                    .iter()
                    .map(|(k, v)| (k.clone(), v.values(size)))
                    .collect(),
                None => Vec::new(),
            };
            expanded.push(entries);
        }

        let maps: Vec<Map<String, Value>> = indices(IxDyn(higher))
            .into_iter()
            .map(|index| {
                let mut map = Map::new();
                for (slot, entries) in expanded.iter().enumerate() {
                    for (key, values) in entries {
                        let value = values.get(index[slot]).cloned().unwrap_or(Value::Null);
                        let _ = map.insert(key.clone(), value);
                    }
                }
                map
            })
            .collect();
        ArrayD::from_shape_vec(IxDyn(higher), maps)
            .map_err(|e| NiftiMrsError::ShapeMismatch(e.to_string()))
    }
}

fn with_nifti_extension(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.ends_with(".nii") || name.ends_with(".nii.gz") {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".nii.gz");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nifti_file_names() {
        assert_eq!(
            with_nifti_extension(Path::new("out/data")),
            PathBuf::from("out/data.nii.gz")
        );
        assert_eq!(
            with_nifti_extension(Path::new("out/data.nii")),
            PathBuf::from("out/data.nii")
        );
        assert_eq!(
            with_nifti_extension(Path::new("data.v2.nii.gz")),
            PathBuf::from("data.v2.nii.gz")
        );
    }

    #[test]
    fn shapes() {
        assert_eq!(squeezed_rank(&[1, 1, 1, 512, 4, 1, 1]), 5);
        assert_eq!(squeezed_rank(&[1, 1, 1, 1]), 4);
        assert_eq!(pad_shape(&[1, 1, 1, 512], 6), vec![1, 1, 1, 512, 1, 1]);
        assert_eq!(&intent_bytes((0, 7))[..9], b"mrs_v0_7\0");
    }

    #[test]
    fn frequency_units() {
        assert_eq!(frequency_in_mhz(123.2), 123.2);
        assert_eq!(frequency_in_mhz(297_200_000.0), 297.2);
    }
}
