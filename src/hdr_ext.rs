//! Module for the in-memory model of the NIfTI-MRS header extension.
//!
//! The header extension is a flat JSON object. Besides the two required
//! fields, it may describe each of the three higher dimensions with a tag,
//! a free-text annotation and a per-index header (serialized as `dim_N`,
//! `dim_N_info` and `dim_N_header`, for N in 5 to 7), and it may hold any
//! number of standard-defined and user-defined fields.

use crate::definitions::{
    is_required, DimensionTag, Definitions, RESONANT_NUCLEUS, SPECTROMETER_FREQUENCY,
};
use crate::dim_header::{header_from_value, header_to_value, DimensionHeader};
use crate::error::{NiftiMrsError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Number of higher dimensions which a header extension can describe.
pub const MAX_HIGHER_DIMS: usize = 3;

/// Description of one of the higher dimensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionInfo {
    /// Semantic tag of the dimension, `None` if the slot is unused.
    pub tag: Option<DimensionTag>,
    /// Free-text annotation.
    pub info: Option<String>,
    /// Per-index header.
    pub header: Option<DimensionHeader>,
}

impl DimensionInfo {
    /// Create a slot with the given tag only.
    pub fn tagged(tag: DimensionTag) -> Self {
        DimensionInfo {
            tag: Some(tag),
            info: None,
            header: None,
        }
    }
}

/// Which part of a dimension slot a `dim_N*` key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DimField {
    Tag,
    Info,
    Header,
}

impl DimField {
    fn suffix(self) -> &'static str {
        match self {
            DimField::Tag => "",
            DimField::Info => "_info",
            DimField::Header => "_header",
        }
    }
}

/// Serialized key of a field of the dimension slot `slot` (0 for `dim_5`).
pub(crate) fn dim_key(slot: usize, field: DimField) -> String {
    format!("dim_{}{}", slot + 5, field.suffix())
}

/// Split a `dim_N[_info|_header]` key into its dimension number N and field.
pub(crate) fn parse_dim_key(key: &str) -> Option<(usize, DimField)> {
    let rest = key.strip_prefix("dim_")?;
    let (number, field) = if let Some(n) = rest.strip_suffix("_info") {
        (n, DimField::Info)
    } else if let Some(n) = rest.strip_suffix("_header") {
        (n, DimField::Header)
    } else {
        (rest, DimField::Tag)
    };
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // no leading zeros: `dim_05` is an ordinary key
    if number.len() > 1 && number.starts_with('0') {
        return None;
    }
    number.parse().ok().map(|n| (n, field))
}

/// Translate a dimension ordinal ("5th", "6th" or "7th") into a slot index.
pub fn slot_from_ordinal(ordinal: &str) -> Result<usize> {
    match ordinal {
        "5th" => Ok(0),
        "6th" => Ok(1),
        "7th" => Ok(2),
        _ => Err(NiftiMrsError::InvalidArgument(format!(
            "dimension must be one of \"5th\", \"6th\" or \"7th\", not {:?}",
            ordinal
        ))),
    }
}

fn check_slot(slot: usize) -> Result<()> {
    if slot < MAX_HIGHER_DIMS {
        Ok(())
    } else {
        Err(NiftiMrsError::InvalidArgument(format!(
            "dimension slot must be 0, 1 or 2, not {}",
            slot
        )))
    }
}

/// A typed view of one field of the header extension.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValueKind<'a> {
    /// One of the required fields.
    Required(Value),
    /// A standard-defined field.
    Standard(&'a Value),
    /// A user-defined field.
    UserDefined(&'a Value),
    /// The tag of a higher dimension.
    DimTag(DimensionTag),
    /// The annotation of a higher dimension.
    DimInfo(&'a str),
    /// The per-index header of a higher dimension.
    DimHeader(&'a DimensionHeader),
}

/// The NIfTI-MRS header extension.
#[derive(Debug, Clone)]
pub struct HeaderExtension {
    spectrometer_frequency: Vec<f64>,
    resonant_nucleus: Vec<String>,
    dim_info: [DimensionInfo; MAX_HIGHER_DIMS],
    standard_data: Map<String, Value>,
    user_data: Map<String, Value>,
}

fn check_frequencies(spec_frequency: &[f64]) -> Result<()> {
    if spec_frequency.is_empty() {
        return Err(NiftiMrsError::InvalidArgument(
            "spectrometer frequency must contain at least one value".to_owned(),
        ));
    }
    if let Some(f) = spec_frequency.iter().find(|f| !f.is_finite()) {
        return Err(NiftiMrsError::InvalidArgument(format!(
            "spectrometer frequency must be finite, not {}",
            f
        )));
    }
    Ok(())
}

fn check_nuclei<S: AsRef<str>>(resonant_nucleus: &[S]) -> Result<()> {
    if resonant_nucleus.is_empty() || resonant_nucleus.iter().any(|n| n.as_ref().is_empty()) {
        return Err(NiftiMrsError::InvalidArgument(
            "resonant nucleus must be one or more non-empty strings".to_owned(),
        ));
    }
    Ok(())
}

/// Read a required field which may be a single value or a list of values.
fn parse_required<T, F>(obj: &Map<String, Value>, key: &str, expected: &str, f: F) -> Result<Vec<T>>
where
    F: Fn(&Value) -> Option<T>,
{
    let value = obj
        .get(key)
        .ok_or_else(|| NiftiMrsError::MissingField(key.to_owned()))?;
    let wrong_type = || NiftiMrsError::WrongType(key.to_owned(), expected.to_owned());
    match value {
        Value::Array(items) => items.iter().map(|v| f(v).ok_or_else(wrong_type)).collect(),
        v => Ok(vec![f(v).ok_or_else(wrong_type)?]),
    }
}

impl HeaderExtension {
    /// Create a header extension out of the required fields.
    ///
    /// If `dimensions` is given it must be between 4 and 7, and the
    /// dimensions beyond the 4th are tagged with the default tags.
    pub fn new<S: AsRef<str>>(
        spec_frequency: &[f64],
        resonant_nucleus: &[S],
        dimensions: Option<usize>,
    ) -> Result<Self> {
        check_frequencies(spec_frequency)?;
        check_nuclei(resonant_nucleus)?;
        let mut dim_info: [DimensionInfo; MAX_HIGHER_DIMS] = Default::default();
        if let Some(dimensions) = dimensions {
            if !(4..=7).contains(&dimensions) {
                return Err(NiftiMrsError::InvalidArgument(format!(
                    "dimensions must be between 4 and 7, not {}",
                    dimensions
                )));
            }
            for (slot, tag) in dim_info
                .iter_mut()
                .zip(DimensionTag::DEFAULTS.iter())
                .take(dimensions - 4)
            {
                *slot = DimensionInfo::tagged(*tag);
            }
        }

        Ok(HeaderExtension {
            spectrometer_frequency: spec_frequency.to_vec(),
            resonant_nucleus: resonant_nucleus
                .iter()
                .map(|n| n.as_ref().to_owned())
                .collect(),
            dim_info,
            standard_data: Map::new(),
            user_data: Map::new(),
        })
    }

    /// Build a header extension from its JSON object form.
    pub fn from_value(value: &Value) -> Result<Self> {
        HeaderExtension::from_value_with(value, Definitions::nifti_mrs())
    }

    /// Build a header extension from its JSON object form, classifying
    /// fields with the given table of definitions.
    pub fn from_value_with(value: &Value, definitions: &Definitions) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            NiftiMrsError::WrongType("header extension".to_owned(), "object".to_owned())
        })?;

        let spectrometer_frequency =
            parse_required(obj, SPECTROMETER_FREQUENCY, "array of float", Value::as_f64)?;
        let resonant_nucleus = parse_required(obj, RESONANT_NUCLEUS, "array of string", |v| {
            v.as_str().map(str::to_owned)
        })?;

        let mut dim_info: [DimensionInfo; MAX_HIGHER_DIMS] = Default::default();
        let mut consumed = Vec::new();
        for (slot, dim) in dim_info.iter_mut().enumerate() {
            let tag_key = dim_key(slot, DimField::Tag);
            let tag = match obj.get(&tag_key) {
                Some(tag) => tag,
                None => continue,
            };
            let tag = tag
                .as_str()
                .ok_or_else(|| NiftiMrsError::WrongType(tag_key.clone(), "string".to_owned()))?;
            dim.tag = Some(tag.parse()?);

            let info_key = dim_key(slot, DimField::Info);
            if let Some(info) = obj.get(&info_key) {
                let info = info
                    .as_str()
                    .ok_or_else(|| NiftiMrsError::WrongType(info_key.clone(), "string".to_owned()))?;
                dim.info = Some(info.to_owned());
            }
            let header_key = dim_key(slot, DimField::Header);
            if let Some(header) = obj.get(&header_key) {
                dim.header = Some(header_from_value(&header_key, header)?);
            }
            consumed.extend(vec![tag_key, info_key, header_key]);
        }

        let mut standard_data = Map::new();
        let mut user_data = Map::new();
        for (key, value) in obj {
            if is_required(key) || consumed.contains(key) {
                continue;
            }
            if definitions.is_standard(key) {
                let _ = standard_data.insert(key.clone(), value.clone());
            } else {
                match value {
                    Value::Object(map) if map.contains_key("Description") => {
                        let _ = user_data.insert(key.clone(), value.clone());
                    }
                    _ => return Err(NiftiMrsError::MalformedUserField(key.clone())),
                }
            }
        }

        Ok(HeaderExtension {
            spectrometer_frequency,
            resonant_nucleus,
            dim_info,
            standard_data,
            user_data,
        })
    }

    /// Parse a header extension from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(NiftiMrsError::NotJson)?;
        HeaderExtension::from_value(&value)
    }

    /// Flatten into the JSON object form.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        let _ = obj.insert(
            SPECTROMETER_FREQUENCY.to_owned(),
            Value::from(self.spectrometer_frequency.clone()),
        );
        let _ = obj.insert(
            RESONANT_NUCLEUS.to_owned(),
            Value::from(self.resonant_nucleus.clone()),
        );
        for (slot, dim) in self.dim_info.iter().enumerate() {
            let tag = match dim.tag {
                Some(tag) => tag,
                None => continue,
            };
            let _ = obj.insert(dim_key(slot, DimField::Tag), Value::from(tag.as_str()));
            if let Some(info) = &dim.info {
                let _ = obj.insert(dim_key(slot, DimField::Info), Value::from(info.as_str()));
            }
            if let Some(header) = &dim.header {
                let _ = obj.insert(dim_key(slot, DimField::Header), header_to_value(header));
            }
        }
        obj.extend(self.standard_data.clone());
        obj.extend(self.user_data.clone());
        Value::Object(obj)
    }

    /// Serialize into a compact JSON string.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Serialize into an indented JSON string.
    pub fn to_json_pretty(&self) -> String {
        // serializing a `Value` cannot fail
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_else(|_| self.to_json())
    }

    /// Number of data dimensions implied by the tagged higher dimensions.
    pub fn ndim(&self) -> usize {
        4 + self.dim_info.iter().take_while(|d| d.tag.is_some()).count()
    }

    /// Precession frequencies in MHz.
    pub fn spectrometer_frequency(&self) -> &[f64] {
        &self.spectrometer_frequency
    }

    /// Replace the spectrometer frequencies.
    pub fn set_spectrometer_frequency(&mut self, spec_frequency: &[f64]) -> Result<()> {
        check_frequencies(spec_frequency)?;
        self.spectrometer_frequency = spec_frequency.to_vec();
        Ok(())
    }

    /// Resonant nuclei, such as "1H".
    pub fn resonant_nucleus(&self) -> &[String] {
        &self.resonant_nucleus
    }

    /// Replace the resonant nuclei.
    pub fn set_resonant_nucleus<S: AsRef<str>>(&mut self, resonant_nucleus: &[S]) -> Result<()> {
        check_nuclei(resonant_nucleus)?;
        self.resonant_nucleus = resonant_nucleus
            .iter()
            .map(|n| n.as_ref().to_owned())
            .collect();
        Ok(())
    }

    /// All three dimension slots, 5th dimension first.
    pub fn dim_infos(&self) -> &[DimensionInfo; MAX_HIGHER_DIMS] {
        &self.dim_info
    }

    /// One dimension slot (0 for the 5th dimension).
    pub fn dim_info(&self, slot: usize) -> Option<&DimensionInfo> {
        self.dim_info.get(slot)
    }

    /// Tags of the three higher dimensions.
    pub fn dim_tags(&self) -> [Option<DimensionTag>; MAX_HIGHER_DIMS] {
        [
            self.dim_info[0].tag,
            self.dim_info[1].tag,
            self.dim_info[2].tag,
        ]
    }

    /// Overwrite a dimension slot (0 for the 5th dimension).
    ///
    /// Annotation and header are cleared if not given.
    pub fn set_dim_info(
        &mut self,
        slot: usize,
        tag: DimensionTag,
        info: Option<&str>,
        header: Option<DimensionHeader>,
    ) -> Result<()> {
        check_slot(slot)?;
        self.dim_info[slot] = DimensionInfo {
            tag: Some(tag),
            info: info.map(str::to_owned),
            header,
        };
        Ok(())
    }

    /// Remove a dimension slot, moving the later slots down by one.
    pub fn remove_dim_info(&mut self, slot: usize) -> Result<()> {
        check_slot(slot)?;
        self.dim_info[slot..].rotate_left(1);
        self.dim_info[MAX_HIGHER_DIMS - 1] = DimensionInfo::default();
        Ok(())
    }

    /// Replace a whole dimension slot.
    pub(crate) fn replace_dim_slot(&mut self, slot: usize, dim: DimensionInfo) -> Result<()> {
        check_slot(slot)?;
        self.dim_info[slot] = dim;
        Ok(())
    }

    /// Replace the per-index header of a dimension slot, keeping tag and annotation.
    pub(crate) fn replace_dim_header(
        &mut self,
        slot: usize,
        header: Option<DimensionHeader>,
    ) -> Result<()> {
        check_slot(slot)?;
        self.dim_info[slot].header = header;
        Ok(())
    }

    /// Standard-defined fields.
    pub fn standard_data(&self) -> &Map<String, Value> {
        &self.standard_data
    }

    /// Value of a standard-defined field.
    pub fn get_standard_def(&self, key: &str) -> Option<&Value> {
        self.standard_data.get(key)
    }

    /// Set a standard-defined field.
    pub fn set_standard_def(&mut self, key: &str, value: Value) -> Result<()> {
        if !Definitions::nifti_mrs().is_standard(key) {
            return Err(NiftiMrsError::UnknownStandardKey(key.to_owned()));
        }
        let _ = self.standard_data.insert(key.to_owned(), value);
        Ok(())
    }

    /// Remove a standard-defined field, returning its value.
    pub fn remove_standard_def(&mut self, key: &str) -> Result<Value> {
        self.standard_data
            .remove(key)
            .ok_or_else(|| NiftiMrsError::KeyNotFound(key.to_owned()))
    }

    /// User-defined fields.
    pub fn user_data(&self) -> &Map<String, Value> {
        &self.user_data
    }

    /// Value of a user-defined field, including its description.
    pub fn get_user_def(&self, key: &str) -> Option<&Value> {
        self.user_data.get(key)
    }

    /// Set a user-defined field.
    ///
    /// Objects receive the description as an additional `Description`
    /// field, any other value is stored as `{"Value": value, "Description": doc}`.
    pub fn set_user_def(&mut self, key: &str, value: Value, doc: &str) -> Result<()> {
        if Definitions::nifti_mrs().is_standard(key) || is_required(key) || parse_dim_key(key).is_some()
        {
            return Err(NiftiMrsError::ReservedKey(key.to_owned()));
        }
        let entry = match value {
            Value::Object(mut map) => {
                let _ = map.insert("Description".to_owned(), Value::from(doc));
                Value::Object(map)
            }
            value => {
                let mut map = Map::new();
                let _ = map.insert("Value".to_owned(), value);
                let _ = map.insert("Description".to_owned(), Value::from(doc));
                Value::Object(map)
            }
        };
        let _ = self.user_data.insert(key.to_owned(), entry);
        Ok(())
    }

    /// Remove a user-defined field, returning its value.
    pub fn remove_user_def(&mut self, key: &str) -> Result<Value> {
        self.user_data
            .remove(key)
            .ok_or_else(|| NiftiMrsError::KeyNotFound(key.to_owned()))
    }

    /// Keys of the flattened JSON form: required fields, then
    /// dimension fields, then standard and user-defined fields.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = vec![
            SPECTROMETER_FREQUENCY.to_owned(),
            RESONANT_NUCLEUS.to_owned(),
        ];
        for (slot, dim) in self.dim_info.iter().enumerate() {
            if dim.tag.is_none() {
                continue;
            }
            keys.push(dim_key(slot, DimField::Tag));
            if dim.info.is_some() {
                keys.push(dim_key(slot, DimField::Info));
            }
            if dim.header.is_some() {
                keys.push(dim_key(slot, DimField::Header));
            }
        }
        keys.extend(self.standard_data.keys().cloned());
        keys.extend(self.user_data.keys().cloned());
        keys
    }

    /// Whether the flattened JSON form contains `key`.
    pub fn has_field(&self, key: &str) -> bool {
        self.get_field(key).is_some()
    }

    /// Look up a field of the flattened JSON form.
    pub fn get_field(&self, key: &str) -> Option<HeaderValueKind> {
        if key == SPECTROMETER_FREQUENCY {
            return Some(HeaderValueKind::Required(Value::from(
                self.spectrometer_frequency.clone(),
            )));
        }
        if key == RESONANT_NUCLEUS {
            return Some(HeaderValueKind::Required(Value::from(
                self.resonant_nucleus.clone(),
            )));
        }
        if let Some((n, field)) = parse_dim_key(key) {
            let dim = self.dim_info.get(n.checked_sub(5)?)?;
            let tag = dim.tag?;
            return match field {
                DimField::Tag => Some(HeaderValueKind::DimTag(tag)),
                DimField::Info => dim.info.as_deref().map(HeaderValueKind::DimInfo),
                DimField::Header => dim.header.as_ref().map(HeaderValueKind::DimHeader),
            };
        }
        if let Some(value) = self.standard_data.get(key) {
            return Some(HeaderValueKind::Standard(value));
        }
        self.user_data.get(key).map(HeaderValueKind::UserDefined)
    }
}

impl PartialEq for HeaderExtension {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl Serialize for HeaderExtension {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HeaderExtension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        HeaderExtension::from_value(&value).map_err(serde::de::Error::custom)
    }
}
