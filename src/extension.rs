//! Storage of the header extension inside a NIfTI extension frame.
//!
//! The JSON text is stored as UTF-8 in an extension with code 44. The
//! frame is padded with zero bytes so that its size is a multiple of 16,
//! hence trailing zeros (and whitespace) are ignored when decoding.

use crate::definitions::MRS_EXTENSION_CODE;
use crate::error::{NiftiMrsError, Result};
use crate::hdr_ext::HeaderExtension;
use nifti::{Extender, Extension, ExtensionSequence};

/// Build the NIfTI extension frame holding a header extension.
pub fn encode(hdr_ext: &HeaderExtension) -> Extension {
    Extension::from_str(MRS_EXTENSION_CODE, &hdr_ext.to_json())
}

/// Build an extension sequence holding only the header extension.
pub fn extension_sequence(hdr_ext: &HeaderExtension) -> ExtensionSequence {
    ExtensionSequence::new(Extender::from([1u8, 0, 0, 0]), vec![encode(hdr_ext)])
}

/// Find the NIfTI-MRS extension among the extensions of a file.
pub fn find_mrs_extension(extensions: &ExtensionSequence) -> Option<&Extension> {
    extensions
        .iter()
        .find(|e| e.code() == MRS_EXTENSION_CODE)
}

/// Obtain the JSON text held by a NIfTI-MRS extension.
pub fn decode(extension: &Extension) -> Result<String> {
    let text = ::std::str::from_utf8(extension.data()).map_err(|e| {
        NiftiMrsError::NotNiftiMrs(format!("header extension is not UTF-8: {}", e))
    })?;
    Ok(text
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_owned())
}
