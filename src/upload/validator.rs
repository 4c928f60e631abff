use crate::error::ValidationError;
use crate::upload::types::RawFile;

/// Checks a candidate file against the size limit and the allowed MIME
/// types. Size is checked first, so each file yields at most one error.
pub fn validate(
    file: &RawFile,
    max_size_bytes: u64,
    allowed_mime_types: &[String],
) -> Result<(), ValidationError> {
    check_size(file, max_size_bytes)?;
    check_type(file, allowed_mime_types)
}

fn check_size(file: &RawFile, max_size_bytes: u64) -> Result<(), ValidationError> {
    if file.size_bytes > max_size_bytes {
        return Err(ValidationError::SizeExceeded {
            name: file.name.clone(),
            size_bytes: file.size_bytes,
            limit_bytes: max_size_bytes,
        });
    }
    Ok(())
}

fn check_type(file: &RawFile, allowed_mime_types: &[String]) -> Result<(), ValidationError> {
    if !allowed_mime_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&file.mime_type))
    {
        return Err(ValidationError::UnsupportedType {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FileConstraints {
    pub max_size_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    /// Report an unsupported type before an oversize file.
    pub type_first: bool,
}

impl FileConstraints {
    pub fn new(max_size_bytes: u64, allowed_mime_types: Vec<String>) -> Self {
        Self {
            max_size_bytes,
            allowed_mime_types,
            type_first: false,
        }
    }

    pub fn type_first(mut self) -> Self {
        self.type_first = true;
        self
    }

    pub fn check(&self, file: &RawFile) -> Result<(), ValidationError> {
        if self.type_first {
            check_type(file, &self.allowed_mime_types)?;
            check_size(file, self.max_size_bytes)
        } else {
            validate(file, self.max_size_bytes, &self.allowed_mime_types)
        }
    }
}
