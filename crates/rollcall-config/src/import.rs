use crate::env_or;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportConfig {
    /// Largest accepted workbook upload in bytes.
    pub max_upload_bytes: usize,
    /// Largest number of data rows accepted in one draft.
    pub max_rows: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 5 * 1024 * 1024,
            max_rows: 2000,
        }
    }
}

impl ImportConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_upload_bytes: env_or("IMPORT_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            max_rows: env_or("IMPORT_MAX_ROWS", defaults.max_rows),
        }
    }
}
