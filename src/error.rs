//! Types for error handling go here.
use nifti::NiftiError;
use std::io::Error as IOError;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum NiftiMrsError {
        /// A malformed value was given where a specific shape or range was required.
        InvalidArgument(msg: String) {
            display("Invalid argument: {}", msg)
        }
        /// A required header extension field is absent.
        MissingField(key: String) {
            display("Header extension must contain `{}`", key)
        }
        /// A key which may never appear in a header extension was found.
        ForbiddenKey(key: String) {
            display("Header extension must not contain `{}`", key)
        }
        /// The dimension tag is not one of the defined tags.
        UnknownTag(tag: String) {
            display("`{}` is not a defined dimension tag", tag)
        }
        /// The key is not a standard-defined metadata key.
        UnknownStandardKey(key: String) {
            display("`{}` is not a standard-defined key", key)
        }
        /// The key is not present in the header extension.
        KeyNotFound(key: String) {
            display("`{}` is not present in the header extension", key)
        }
        /// A standard-defined (or otherwise reserved) key was used for a user-defined field.
        ReservedKey(key: String) {
            display("`{}` is reserved and cannot be user-defined", key)
        }
        /// A user-defined field is not an object with a `Description`.
        MalformedUserField(key: String) {
            display("User-defined field `{}` must be a JSON object and include a \"Description\"", key)
        }
        /// A field's value does not match its declared type.
        WrongType(key: String, expected: String) {
            display("`{}` must be of type {}", key, expected)
        }
        /// The presence of a `dim_N` field disagrees with the data rank.
        DimensionTagExceedsRank(key: String, data_dimensions: usize) {
            display("`{}` is inconsistent with {} data dimensions", key, data_dimensions)
        }
        /// A per-index header value is neither a list nor a `{start, increment}` object.
        BadDynamicHeaderFormat(key: String, reason: String) {
            display("Dynamic header `{}` is malformed: {}", key, reason)
        }
        /// A per-index header list does not match the length of its axis.
        BadDynamicHeaderShape(key: String, expected: usize, found: usize) {
            display("Dynamic header `{}` has {} entries, but the dimension has size {}", key, found, expected)
        }
        /// The dimension tags of an object are not compatible with the requested operation.
        IncompatibleTags(msg: String) {
            display("Incompatible dimension tags: {}", msg)
        }
        /// The dimension tags or dimension headers of two objects differ.
        TagMismatch(msg: String) {
            display("Dimension mismatch: {}", msg)
        }
        /// Array shapes are inconsistent with one another or with a requested shape.
        ShapeMismatch(msg: String) {
            display("Shape mismatch: {}", msg)
        }
        /// A new higher dimension was created without a tag to describe it.
        MissingDimensionTag(dim: usize) {
            display("Dimension {} must be given a tag", dim + 1)
        }
        /// An index lies outside the permitted range of a dimension.
        IndexOutOfRange(index: usize, size: usize) {
            display("Index {} is out of range for a dimension of size {}", index, size)
        }
        /// No dimension carries the given tag.
        DimensionNotFound(tag: String) {
            display("No dimension is tagged `{}`", tag)
        }
        /// A dimension index outside of the higher dimensions.
        InvalidDimension(dim: usize, ndim: usize) {
            display("Dimension index {} must be between 4 and {}", dim, ndim.saturating_sub(1))
        }
        /// The header extension could not be parsed as JSON.
        NotJson(err: serde_json::Error) {
            source(err)
            display("Header extension is not valid JSON: {}", err)
        }
        /// The file is a NIfTI file, but not a NIfTI-MRS file.
        NotNiftiMrs(msg: String) {
            display("Not a NIfTI-MRS file: {}", msg)
        }
        /// The data array cannot be held by a NIfTI-MRS object.
        InvalidData(msg: String) {
            display("Invalid NIfTI-MRS data: {}", msg)
        }
        /// The NIfTI header does not fulfil the NIfTI-MRS requirements.
        InvalidNiftiHeader(msg: String) {
            display("Invalid NIfTI-MRS header: {}", msg)
        }
        /// Failure in the underlying NIfTI implementation.
        Nifti(err: NiftiError) {
            from()
            source(err)
            display("NIfTI error: {}", err)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, NiftiMrsError>;
