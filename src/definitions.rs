//! This module contains the definitions made by the NIfTI-MRS standard:
//! the dimension tags which may describe the higher dimensions, and the
//! table of standard-defined metadata keys with their types.
//!
//! The table is plain static data. Components which need it take a
//! [`Definitions`] value, which defaults to the NIfTI-MRS table.

use crate::error::NiftiMrsError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// NIfTI-MRS version produced by this crate, as `(major, minor)`.
pub const NIFTI_MRS_VERSION: (u32, u32) = (0, 7);

/// Oldest NIfTI-MRS version which can be loaded.
pub const MIN_NIFTI_MRS_VERSION: (u32, u32) = (0, 2);

/// NIfTI extension code reserved for the NIfTI-MRS header extension.
pub const MRS_EXTENSION_CODE: i32 = 44;

/// Key of the required spectrometer frequency field (MHz).
pub const SPECTROMETER_FREQUENCY: &str = "SpectrometerFrequency";

/// Key of the required resonant nucleus field.
pub const RESONANT_NUCLEUS: &str = "ResonantNucleus";

/// Keys which every header extension must contain.
pub const REQUIRED_KEYS: [&str; 2] = [SPECTROMETER_FREQUENCY, RESONANT_NUCLEUS];

/// NIfTI `xyzt_units` code for millimetres.
pub const NIFTI_UNITS_MM: u8 = 2;

/// NIfTI `xyzt_units` code for seconds.
pub const NIFTI_UNITS_SEC: u8 = 8;

/// Semantic meaning of one of the higher (5th to 7th) dimensions.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum DimensionTag {
    /// Data from each individual receiver coil element.
    #[serde(rename = "DIM_COIL")]
    Coil,
    /// Each individual acquisition transient.
    #[serde(rename = "DIM_DYN")]
    Dyn,
    /// First indirect detection dimension.
    #[serde(rename = "DIM_INDIRECT_0")]
    Indirect0,
    /// Second indirect detection dimension.
    #[serde(rename = "DIM_INDIRECT_1")]
    Indirect1,
    /// Third indirect detection dimension.
    #[serde(rename = "DIM_INDIRECT_2")]
    Indirect2,
    /// Increments of phase-cycling.
    #[serde(rename = "DIM_PHASE_CYCLE")]
    PhaseCycle,
    /// Edited MRS conditions (e.g. MEGA or HERMES).
    #[serde(rename = "DIM_EDIT")]
    Edit,
    /// Repeats of the full sequence within the same original file.
    #[serde(rename = "DIM_MEAS")]
    Meas,
    /// User defined dimension.
    #[serde(rename = "DIM_USER_0")]
    User0,
    /// User defined dimension.
    #[serde(rename = "DIM_USER_1")]
    User1,
    /// User defined dimension.
    #[serde(rename = "DIM_USER_2")]
    User2,
    /// Image-selected in vivo spectroscopy (ISIS) acquisitions.
    #[serde(rename = "DIM_ISIS")]
    Isis,
}

impl DimensionTag {
    /// All defined dimension tags.
    pub const ALL: [DimensionTag; 12] = [
        DimensionTag::Coil,
        DimensionTag::Dyn,
        DimensionTag::Indirect0,
        DimensionTag::Indirect1,
        DimensionTag::Indirect2,
        DimensionTag::PhaseCycle,
        DimensionTag::Edit,
        DimensionTag::Meas,
        DimensionTag::User0,
        DimensionTag::User1,
        DimensionTag::User2,
        DimensionTag::Isis,
    ];

    /// Tags assigned to the 5th, 6th and 7th dimensions when none are given.
    pub const DEFAULTS: [DimensionTag; 3] = [
        DimensionTag::Coil,
        DimensionTag::Dyn,
        DimensionTag::Indirect0,
    ];

    /// The tag as written in the header extension.
    pub fn as_str(self) -> &'static str {
        use DimensionTag::*;
        match self {
            Coil => "DIM_COIL",
            Dyn => "DIM_DYN",
            Indirect0 => "DIM_INDIRECT_0",
            Indirect1 => "DIM_INDIRECT_1",
            Indirect2 => "DIM_INDIRECT_2",
            PhaseCycle => "DIM_PHASE_CYCLE",
            Edit => "DIM_EDIT",
            Meas => "DIM_MEAS",
            User0 => "DIM_USER_0",
            User1 => "DIM_USER_1",
            User2 => "DIM_USER_2",
            Isis => "DIM_ISIS",
        }
    }

    /// Human readable description of the tag.
    pub fn description(self) -> &'static str {
        use DimensionTag::*;
        match self {
            Coil => "For storage of data from each individual receiver coil element.",
            Dyn => "For storage of each individual acquisition transient. E.g. for post-acquisition B0 drift correction.",
            Indirect0 | Indirect1 | Indirect2 => {
                "The indirect detection dimension - necessary for 2D (and greater) MRS acquisitions."
            }
            PhaseCycle => "Used for increments of phase-cycling, for example in dephasing unwanted coherence order pathways, or TPPI for 2D spectra.",
            Edit => "Used for edited MRS techniques such as MEGA or HERMES.",
            Meas => "Used to indicate multiple repeats of the full sequence contained within the same original data file.",
            User0 | User1 | User2 => "User defined dimension.",
            Isis => "Dimension for storing image-selected in vivo spectroscopy (ISIS) acquisitions.",
        }
    }
}

impl FromStr for DimensionTag {
    type Err = NiftiMrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DimensionTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| NiftiMrsError::UnknownTag(s.to_owned()))
    }
}

impl fmt::Display for DimensionTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type of a metadata value, as declared by the schema.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum JsonType {
    /// Any JSON number.
    Float,
    /// A string.
    Str,
    /// A boolean.
    Bool,
    /// A JSON object.
    Object,
    /// An array of arbitrary elements.
    Array,
    /// An array of elements of the given type.
    ArrayOf(&'static JsonType),
}

impl JsonType {
    /// Check whether `value` is of this type.
    ///
    /// Arrays are checked by their first element only, recursively
    /// for nested array types. Empty arrays are accepted.
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (JsonType::Float, Value::Number(_))
            | (JsonType::Str, Value::String(_))
            | (JsonType::Bool, Value::Bool(_))
            | (JsonType::Object, Value::Object(_))
            | (JsonType::Array, Value::Array(_)) => true,
            (JsonType::ArrayOf(inner), Value::Array(items)) => {
                items.first().map_or(true, |first| inner.matches(first))
            }
            _ => false,
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JsonType::Float => f.write_str("float"),
            JsonType::Str => f.write_str("string"),
            JsonType::Bool => f.write_str("bool"),
            JsonType::Object => f.write_str("object"),
            JsonType::Array => f.write_str("array"),
            JsonType::ArrayOf(inner) => write!(f, "array of {}", inner),
        }
    }
}

/// Definition of a single standard-defined metadata key.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StandardDefinition {
    /// Key in the header extension.
    pub key: &'static str,
    /// Declared type of the value.
    pub json_type: JsonType,
    /// Unit of the value, if any.
    pub unit: Option<&'static str>,
    /// Human readable description.
    pub doc: &'static str,
    /// Whether the value identifies the subject and must be removed on anonymisation.
    pub anonymise: bool,
}

const fn def(
    key: &'static str,
    json_type: JsonType,
    unit: Option<&'static str>,
    doc: &'static str,
    anonymise: bool,
) -> StandardDefinition {
    StandardDefinition {
        key,
        json_type,
        unit,
        doc,
        anonymise,
    }
}

const LIST_OF_FLOAT: JsonType = JsonType::ArrayOf(&JsonType::Float);
const LIST_OF_STR: JsonType = JsonType::ArrayOf(&JsonType::Str);

/// All keys defined by the NIfTI-MRS standard, apart from the required ones.
#[rustfmt::skip]
pub static STANDARD_DEFINED: &[StandardDefinition] = &[
    // MRS specific
    def("EchoTime", JsonType::Float, Some("s"),
        "Time from centroid of excitation to start of FID or centre of echo. Units: Seconds", false),
    def("RepetitionTime", JsonType::Float, Some("s"),
        "Sequence repetition time. Units: Seconds", false),
    def("InversionTime", JsonType::Float, Some("s"),
        "Inversion time. Units: Seconds", false),
    def("MixingTime", JsonType::Float, Some("s"),
        "Mixing time in e.g. STEAM sequence. Units: Seconds", false),
    def("AcquisitionStartTime", JsonType::Float, Some("s"),
        "Time, relative to EchoTime, that the acquisition starts. Units: Seconds", false),
    def("ExcitationFlipAngle", JsonType::Float, Some("degrees"),
        "Nominal excitation pulse flip-angle", false),
    def("TxOffset", JsonType::Float, Some("ppm"),
        "Transmit chemical shift offset from SpectrometerFrequency", false),
    def("VOI", JsonType::ArrayOf(&LIST_OF_FLOAT), None,
        "VoI localisation volume for MRSI sequences. Stored as a 4 x 4 affine.", false),
    def("WaterSuppressed", JsonType::Bool, None,
        "Whether data was collected with water suppression.", false),
    def("WaterSuppressionType", JsonType::Str, None,
        "Type of water suppression used.", false),
    def("SequenceTriggered", JsonType::Bool, None,
        "Whether the sequence is triggered.", false),
    // scanner information
    def("Manufacturer", JsonType::Str, None,
        "Manufacturer of the device. DICOM tag (0008,0070).", false),
    def("ManufacturersModelName", JsonType::Str, None,
        "Manufacturer's model name of the device. DICOM tag (0008,1090).", true),
    def("DeviceSerialNumber", JsonType::Str, None,
        "Manufacturer's serial number of the device. DICOM tag (0018,1000).", true),
    def("SoftwareVersions", JsonType::Str, None,
        "Manufacturer's designation of the software version. DICOM tag (0018,1020)", false),
    def("InstitutionName", JsonType::Str, None,
        "Institution's Name. DICOM tag (0008,0080).", false),
    def("InstitutionAddress", JsonType::Str, None,
        "Institution's address. DICOM tag (0008,0081).", false),
    def("TxCoil", JsonType::Str, None,
        "Name or description of transmit RF coil.", false),
    def("RxCoil", JsonType::Str, None,
        "Name or description of receive RF coil.", false),
    // sequence information
    def("SequenceName", JsonType::Str, None,
        "User defined name. DICOM tag (0018,0024).", false),
    def("ProtocolName", JsonType::Str, None,
        "User-defined description of the conditions under which the Series was performed. DICOM tag (0018,1030).", false),
    // subject information
    def("PatientPosition", JsonType::Str, None,
        "Patient position descriptor relative to the equipment. DICOM tag (0018,5100).", false),
    def("PatientName", JsonType::Str, None,
        "Patient's full name. DICOM tag (0010,0010).", true),
    def("PatientID", JsonType::Str, None,
        "Patient identifier. DICOM tag (0010,0020).", true),
    def("PatientWeight", JsonType::Float, Some("kg"),
        "Weight of the Patient in kilograms. DICOM tag (0010,1030).", false),
    def("PatientDoB", JsonType::Str, None,
        "Date of birth of the named Patient. YYYYMMDD. DICOM tag (0010,0030).", true),
    def("PatientSex", JsonType::Str, None,
        "Sex of the named Patient. 'M', 'F', 'O'. DICOM tag (0010,0040)", false),
    // provenance and conversion
    def("ConversionMethod", JsonType::Str, None,
        "Description of the process or program used for conversion.", false),
    def("ConversionTime", JsonType::Str, None,
        "Time and date of conversion. ISO 8601 compliant format", false),
    def("OriginalFile", LIST_OF_STR, None,
        "Name and extension of the original file(s)", true),
    // spatial information
    def("kSpace", JsonType::ArrayOf(&JsonType::Bool), None,
        "Three element list, true where the spatial dimension is stored as k-space.", false),
    // editing pulses
    def("EditCondition", LIST_OF_STR, None,
        "Entries of the EditPulse structure used in this data acquisition.", false),
    def("EditPulse", JsonType::Object, None,
        "Structure defining editing pulse parameters for each condition.", false),
    // processing provenance
    def("ProcessingApplied", JsonType::Array, None,
        "Describes and records the processing steps applied to the data.", false),
];

/// A table of standard-defined metadata keys.
#[derive(Debug, Clone, Copy)]
pub struct Definitions {
    standard: &'static [StandardDefinition],
}

static NIFTI_MRS_DEFINITIONS: Definitions = Definitions {
    standard: STANDARD_DEFINED,
};

impl Definitions {
    /// Create a table from the given standard definitions.
    pub const fn new(standard: &'static [StandardDefinition]) -> Self {
        Definitions { standard }
    }

    /// The table of the NIfTI-MRS standard.
    pub fn nifti_mrs() -> &'static Definitions {
        &NIFTI_MRS_DEFINITIONS
    }

    /// Look up the definition of a standard-defined key.
    pub fn standard(&self, key: &str) -> Option<&'static StandardDefinition> {
        self.standard.iter().find(|d| d.key == key)
    }

    /// Whether `key` is standard-defined.
    pub fn is_standard(&self, key: &str) -> bool {
        self.standard(key).is_some()
    }

    /// Iterate over all standard definitions.
    pub fn iter(&self) -> impl Iterator<Item = &'static StandardDefinition> {
        self.standard.iter()
    }
}

impl Default for Definitions {
    fn default() -> Self {
        NIFTI_MRS_DEFINITIONS
    }
}

/// Whether `key` is one of the required keys.
pub fn is_required(key: &str) -> bool {
    REQUIRED_KEYS.contains(&key)
}

/// Gyromagnetic ratio of a nucleus, in MHz/T.
pub fn gyromagnetic_ratio(nucleus: &str) -> Option<f64> {
    match nucleus {
        "1H" => Some(42.576),
        "2H" => Some(6.536),
        "13C" => Some(10.7084),
        "31P" => Some(17.235),
        _ => None,
    }
}
