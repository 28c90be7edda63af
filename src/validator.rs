//! Validation of NIfTI-MRS data, NIfTI headers and header extensions.
//!
//! Header extension validation runs a fixed sequence of checks and stops
//! at the first failure, reporting it with a specific error variant.

use crate::definitions::{
    is_required, DimensionTag, Definitions, MIN_NIFTI_MRS_VERSION, RESONANT_NUCLEUS,
    SPECTROMETER_FREQUENCY,
};
use crate::error::{NiftiMrsError, Result};
use crate::hdr_ext::{dim_key, parse_dim_key, DimField};
use nifti::{NiftiHeader, NiftiType};
use serde_json::{Map, Value};

/// Validates header extensions against a table of definitions.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    definitions: &'a Definitions,
}

impl Default for Validator<'static> {
    fn default() -> Self {
        Validator::new(Definitions::nifti_mrs())
    }
}

impl<'a> Validator<'a> {
    /// Create a validator using the given definitions.
    pub fn new(definitions: &'a Definitions) -> Self {
        Validator { definitions }
    }

    /// Validate a serialized header extension.
    ///
    /// `axis_sizes` is the shape of the data, padded with trailing ones
    /// where shorter than the number of data dimensions. If
    /// `data_dimensions` is not given, it is inferred from the highest
    /// `dim_N` key present.
    pub fn validate_hdr_ext(
        &self,
        header_json: &str,
        axis_sizes: &[usize],
        data_dimensions: Option<usize>,
    ) -> Result<()> {
        let value: Value = serde_json::from_str(header_json).map_err(NiftiMrsError::NotJson)?;
        self.validate_value(&value, axis_sizes, data_dimensions)
    }

    /// Validate a header extension already parsed as JSON.
    pub fn validate_value(
        &self,
        value: &Value,
        axis_sizes: &[usize],
        data_dimensions: Option<usize>,
    ) -> Result<()> {
        let obj = value.as_object().ok_or_else(|| {
            NiftiMrsError::WrongType("header extension".to_owned(), "object".to_owned())
        })?;

        check_required_list(obj, SPECTROMETER_FREQUENCY, "non-empty array of float", Value::is_number)?;
        check_required_list(obj, RESONANT_NUCLEUS, "non-empty array of string", Value::is_string)?;

        let data_dimensions = data_dimensions.unwrap_or_else(|| inferred_dimensions(value));
        let mut sizes = axis_sizes.to_vec();
        if sizes.len() < data_dimensions {
            sizes.resize(data_dimensions, 1);
        }

        for slot in 0..3 {
            self.check_dimension(obj, slot, data_dimensions)?;
        }

        for key in obj.keys() {
            if let Some((n, _)) = parse_dim_key(key) {
                if !(5..=7).contains(&n) {
                    return Err(NiftiMrsError::ForbiddenKey(key.clone()));
                }
            }
        }

        for def in self.definitions.iter() {
            if let Some(value) = obj.get(def.key) {
                if !def.json_type.matches(value) {
                    return Err(NiftiMrsError::WrongType(
                        def.key.to_owned(),
                        def.json_type.to_string(),
                    ));
                }
            }
        }

        for (key, value) in obj {
            if is_required(key) || parse_dim_key(key).is_some() || self.definitions.is_standard(key)
            {
                continue;
            }
            if !is_described(value) {
                return Err(NiftiMrsError::MalformedUserField(key.clone()));
            }
        }

        for slot in 0..3 {
            if let Some(Value::Object(header)) = obj.get(&dim_key(slot, DimField::Header)) {
                self.check_dynamic_header(header, sizes[slot + 4])?;
            }
        }

        Ok(())
    }

    fn check_dimension(
        &self,
        obj: &Map<String, Value>,
        slot: usize,
        data_dimensions: usize,
    ) -> Result<()> {
        let tag_key = dim_key(slot, DimField::Tag);
        let info_key = dim_key(slot, DimField::Info);
        let header_key = dim_key(slot, DimField::Header);

        if data_dimensions > slot + 4 {
            let tag = obj.get(&tag_key).ok_or_else(|| {
                NiftiMrsError::DimensionTagExceedsRank(tag_key.clone(), data_dimensions)
            })?;
            let tag = tag
                .as_str()
                .ok_or_else(|| NiftiMrsError::UnknownTag(tag.to_string()))?;
            let _: DimensionTag = tag.parse()?;

            if let Some(info) = obj.get(&info_key) {
                if !info.is_string() {
                    return Err(NiftiMrsError::WrongType(info_key, "string".to_owned()));
                }
            }
            if let Some(header) = obj.get(&header_key) {
                if !header.is_object() {
                    return Err(NiftiMrsError::WrongType(header_key, "object".to_owned()));
                }
            }
        } else {
            for key in vec![tag_key, info_key, header_key] {
                if obj.contains_key(&key) {
                    return Err(NiftiMrsError::DimensionTagExceedsRank(key, data_dimensions));
                }
            }
        }
        Ok(())
    }

    fn check_dynamic_header(&self, header: &Map<String, Value>, size: usize) -> Result<()> {
        for (key, value) in header {
            let value = if self.definitions.is_standard(key) {
                value
            } else {
                match value {
                    Value::Object(map) if map.contains_key("Description") => map
                        .get("Value")
                        .ok_or_else(|| NiftiMrsError::MalformedUserField(key.clone()))?,
                    _ => return Err(NiftiMrsError::MalformedUserField(key.clone())),
                }
            };
            match value {
                Value::Array(items) if items.len() == size => {}
                Value::Array(items) => {
                    return Err(NiftiMrsError::BadDynamicHeaderShape(
                        key.clone(),
                        size,
                        items.len(),
                    ));
                }
                Value::Object(map) if map.contains_key("start") && map.contains_key("increment") => {}
                _ => {
                    return Err(NiftiMrsError::BadDynamicHeaderFormat(
                        key.clone(),
                        "must be a list or an object with `start` and `increment`".to_owned(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn check_required_list(
    obj: &Map<String, Value>,
    key: &str,
    expected: &str,
    element_check: fn(&Value) -> bool,
) -> Result<()> {
    match obj.get(key) {
        None => Err(NiftiMrsError::MissingField(key.to_owned())),
        Some(Value::Array(items)) if !items.is_empty() && items.iter().all(element_check) => Ok(()),
        Some(_) => Err(NiftiMrsError::WrongType(key.to_owned(), expected.to_owned())),
    }
}

fn is_described(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |map| map.contains_key("Description"))
}

/// Validate a serialized header extension with the NIfTI-MRS definitions.
///
/// See [`Validator::validate_hdr_ext`].
pub fn validate_hdr_ext(
    header_json: &str,
    axis_sizes: &[usize],
    data_dimensions: Option<usize>,
) -> Result<()> {
    Validator::default().validate_hdr_ext(header_json, axis_sizes, data_dimensions)
}

/// Number of data dimensions implied by the highest `dim_N` tag of a
/// header extension, or 4 if there is none.
pub fn inferred_dimensions(value: &Value) -> usize {
    (5..=7)
        .rev()
        .find(|&n| value.get(&dim_key(n - 5, DimField::Tag)).is_some())
        .unwrap_or(4)
}

/// Check that data of this shape can be held by a NIfTI-MRS object.
pub fn validate_nifti_data(shape: &[usize]) -> Result<()> {
    if shape.len() < 4 || shape.len() > 7 {
        return Err(NiftiMrsError::InvalidData(format!(
            "data must have between 4 and 7 dimensions, it has {}",
            shape.len()
        )));
    }
    Ok(())
}

/// Check the data type, dwell time and intent name of a NIfTI header.
pub fn validate_nifti_header(header: &NiftiHeader) -> Result<()> {
    match header.data_type()? {
        NiftiType::Complex64 | NiftiType::Complex128 => {}
        other => {
            return Err(NiftiMrsError::InvalidNiftiHeader(format!(
                "data type {:?} is not complex",
                other
            )));
        }
    }

    let dwelltime = header.pixdim[4];
    if dwelltime <= 0.0 || dwelltime > 1.0 {
        return Err(NiftiMrsError::InvalidNiftiHeader(format!(
            "dwell time ({}) is unrealistic",
            dwelltime
        )));
    }

    let intent = intent_name(header);
    match parse_intent_version(&intent) {
        Some(version) if version >= MIN_NIFTI_MRS_VERSION => Ok(()),
        Some((major, minor)) => Err(NiftiMrsError::NotNiftiMrs(format!(
            "NIfTI-MRS version {}.{} is not supported",
            major, minor
        ))),
        None => Err(NiftiMrsError::InvalidNiftiHeader(format!(
            "intent name ({}) does not match \"mrs_vMajor_minor\"",
            intent
        ))),
    }
}

/// The intent name of a header as a string.
pub fn intent_name(header: &NiftiHeader) -> String {
    let end = header
        .intent_name
        .iter()
        .position(|&b| b == 0)
        .unwrap_or_else(|| header.intent_name.len());
    String::from_utf8_lossy(&header.intent_name[..end]).into_owned()
}

/// Read the NIfTI-MRS version out of an intent name such as `mrs_v0_2`.
pub fn parse_intent_version(intent: &str) -> Option<(u32, u32)> {
    let rest = intent.strip_prefix("mrs_v")?;
    let mut parts = rest.splitn(2, '_');
    let major = parts.next()?;
    let minor = parts.next()?;
    let minor_len = minor
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) || minor_len == 0 {
        return None;
    }
    Some((major.parse().ok()?, minor[..minor_len].parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intent_versions() {
        assert_eq!(parse_intent_version("mrs_v0_2"), Some((0, 2)));
        assert_eq!(parse_intent_version("mrs_v1_10"), Some((1, 10)));
        assert_eq!(parse_intent_version("mrs_v0_7_extra"), Some((0, 7)));
        assert_eq!(parse_intent_version("mrs_v_2"), None);
        assert_eq!(parse_intent_version("mrs_v02"), None);
        assert_eq!(parse_intent_version(""), None);
    }

    #[test]
    fn data_rank() {
        assert!(validate_nifti_data(&[1, 1, 1, 512]).is_ok());
        assert!(validate_nifti_data(&[1, 1, 1, 512, 2, 2, 2]).is_ok());
        assert!(validate_nifti_data(&[1, 1, 512]).is_err());
        assert!(validate_nifti_data(&[1, 1, 1, 512, 2, 2, 2, 2]).is_err());
    }

    #[test]
    fn injected_definitions() {
        static NONE: Definitions = Definitions::new(&[]);
        let hdr = json!({
            "SpectrometerFrequency": [123.2],
            "ResonantNucleus": ["1H"],
            "EchoTime": 0.03,
        });
        assert!(Validator::default().validate_value(&hdr, &[1, 1, 1, 512], None).is_ok());
        match Validator::new(&NONE).validate_value(&hdr, &[1, 1, 1, 512], None) {
            Err(NiftiMrsError::MalformedUserField(k)) => assert_eq!(k, "EchoTime"),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
