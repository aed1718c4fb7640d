use thiserror::Error;

use crate::field::Field;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Could not read workbook: {0}")]
    Workbook(String),

    #[error("The workbook has no worksheets")]
    NoWorksheet,

    #[error("The first worksheet has no header row")]
    MissingHeader,

    #[error("The worksheet has no data rows")]
    NoRows,

    #[error("Too many rows: {found} (maximum {max})")]
    TooManyRows { found: usize, max: usize },

    #[error("Missing required columns: {}", Field::labels(.0))]
    MissingColumns(Vec<Field>),

    #[error("Row {0} does not exist")]
    RowOutOfRange(usize),

    #[error("Unknown import kind: {0}")]
    UnknownKind(String),
}

impl ImportError {
    /// Problems with the uploaded file itself, as opposed to a bad row index or kind.
    pub fn is_rejected_upload(&self) -> bool {
        matches!(
            self,
            ImportError::Workbook(_)
                | ImportError::NoWorksheet
                | ImportError::MissingHeader
                | ImportError::NoRows
                | ImportError::TooManyRows { .. }
                | ImportError::MissingColumns(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_labels() {
        let err = ImportError::MissingColumns(vec![Field::Email, Field::RollNumber]);
        assert_eq!(
            err.to_string(),
            "Missing required columns: Email, Roll Number"
        );
        assert!(err.is_rejected_upload());
        assert!(!ImportError::RowOutOfRange(3).is_rejected_upload());
    }
}
