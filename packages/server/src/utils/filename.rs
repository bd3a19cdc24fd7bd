/// Accepted deliverable formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Docx,
    Zip,
}

impl UploadKind {
    pub const ALL: &'static [UploadKind] = &[Self::Pdf, Self::Docx, Self::Zip];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Zip => "zip",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Zip => "application/zip",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.extension() == ext)
    }

    fn from_mime_type(mime: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.mime_type() == mime)
    }
}

/// Result of validating an upload filename.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty.
    Empty,
    /// Stem contains something other than letters, digits, `_` or `-`.
    InvalidCharacter,
    /// No extension, or an extension other than pdf, docx or zip.
    UnsupportedExtension,
    /// Declared content type is not one of the accepted formats.
    UnsupportedFileType,
    /// Declared content type does not match the extension.
    FileTypeMismatch,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "File name cannot be empty",
            Self::InvalidCharacter => {
                "Invalid file name: only letters, digits, '_' and '-' are allowed before the extension"
            }
            Self::UnsupportedExtension => "Invalid file name: extension must be pdf, docx or zip",
            Self::UnsupportedFileType => "Unsupported file type: must be PDF, DOCX or ZIP",
            Self::FileTypeMismatch => "File type does not match the file name extension",
        }
    }
}

/// Validates an upload filename against `^[A-Za-z0-9_-]+\.(pdf|docx|zip)$`.
pub fn validate_upload_filename(file_name: &str) -> Result<UploadKind, FilenameError> {
    if file_name.is_empty() {
        return Err(FilenameError::Empty);
    }

    let (stem, ext) = file_name
        .split_once('.')
        .ok_or(FilenameError::UnsupportedExtension)?;

    if stem.is_empty()
        || !stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(FilenameError::InvalidCharacter);
    }

    UploadKind::from_extension(ext).ok_or(FilenameError::UnsupportedExtension)
}

/// Validates an upload filename together with its declared content type.
pub fn validate_upload(file_name: &str, file_type: &str) -> Result<UploadKind, FilenameError> {
    let kind = validate_upload_filename(file_name)?;
    let declared =
        UploadKind::from_mime_type(file_type.trim()).ok_or(FilenameError::UnsupportedFileType)?;
    if declared != kind {
        return Err(FilenameError::FileTypeMismatch);
    }
    Ok(kind)
}
