//! Density altitude correction for Kestrel weather meter logs.
//!
//! The logger's density altitude column is either recomputed from the recorded
//! temperature, pressure and dew point (`dry_air` / `wet_air`), or repaired in place by
//! unwrapping the counter overflow near 10,600 ft (`offset`).

pub mod correction_pipeline;
pub mod density_altitude;
pub mod error;
pub mod log_file;
pub mod overflow_unwrapper;
pub mod record_codec;

pub use correction_pipeline::{correct, correct_document, CorrectionMode, CorrectionStats, N_HEADER_LINES};
pub use error::{FixError, FixResult};
pub use log_file::{process_directory, process_log_file, FileReport, CORRECTED_FILE_SUFFIX};
pub use overflow_unwrapper::{OverflowUnwrapper, UnwrapConfig, WrapEvent};
