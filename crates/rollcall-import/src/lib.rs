//! # Rollcall Import
//!
//! Roster import for faculty and students, free of I/O so the HTTP layer
//! only has to load and store drafts.
//!
//! 1. [`sheet::read_workbook`] turns the upload into header and data rows.
//! 2. [`columns::detect_columns`] maps headers onto [`Field`]s.
//! 3. [`ImportBatch::from_sheet`] extracts the rows into a draft.
//! 4. [`ImportBatch::revalidate`] attaches [`RowIssue`]s, given the
//!    [`ExistingRecords`] already in the database.
//!
//! # Example
//!
//! ```ignore
//! use rollcall_import::{ImportBatch, ImportKind, ExistingRecords, read_workbook};
//!
//! let sheet = read_workbook(bytes)?;
//! let (mut batch, report) =
//!     ImportBatch::from_sheet(ImportKind::Faculty, institution_kind, &sheet, 2000)?;
//! batch.revalidate(&ExistingRecords::default(), today);
//! assert!(batch.is_ready());
//! ```

pub mod batch;
pub mod columns;
pub mod error;
pub mod field;
pub mod sheet;
pub mod validate;

pub use batch::{ExistingRecords, ImportBatch, ImportRow, KnownSection};
pub use columns::{ColumnMapping, ColumnReport, TemplateColumn, detect_columns, template};
pub use error::ImportError;
pub use field::{Field, ImportKind, RowFields};
pub use sheet::{Sheet, SheetRow, read_workbook};
pub use validate::{RowIssue, normalize_phone, parse_bounded, parse_date};
