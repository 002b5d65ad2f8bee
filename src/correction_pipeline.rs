//! Log correction pipeline.
//!
//! Splits a document into its fixed header and data rows, recomputes or unwraps the density
//! altitude column, and reassembles the document. Any malformed row aborts the whole
//! document so row count and order stay aligned with the header.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::density_altitude;
use crate::error::{FixError, FixResult};
use crate::overflow_unwrapper::{OverflowUnwrapper, UnwrapConfig, Unwrapped, WrapEvent};
use crate::record_codec::{self, DataRow};

/// Number of metadata/units lines at the top of a Kestrel export.
pub const N_HEADER_LINES: usize = 5;

/// How the density altitude column is corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMode {
    /// Recompute with the dry air standard atmosphere model
    #[value(name = "dry_air")]
    DryAir,
    /// Recompute with the humidity corrected model
    #[value(name = "wet_air")]
    WetAir,
    /// Unwrap counter overflow in the recorded values
    #[value(name = "offset")]
    Offset,
}

impl CorrectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionMode::DryAir => "dry_air",
            CorrectionMode::WetAir => "wet_air",
            CorrectionMode::Offset => "offset",
        }
    }
}

impl fmt::Display for CorrectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrectionMode {
    type Err = FixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry_air" => Ok(CorrectionMode::DryAir),
            "wet_air" => Ok(CorrectionMode::WetAir),
            "offset" => Ok(CorrectionMode::Offset),
            other => Err(FixError::UnknownMode(other.to_string())),
        }
    }
}

/// Summary of one corrected document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionStats {
    pub rows: usize,
    pub wrap_events: Vec<WrapEvent>,
    pub max_wrap_depth: i32,
}

fn decode_at(line_no: usize, row: &str) -> FixResult<DataRow> {
    record_codec::decode(row).map_err(|e| e.at_line(line_no))
}

fn recompute<F>(rows: &[&str], mode: CorrectionMode, model: F) -> FixResult<Vec<String>>
where
    F: Fn(&DataRow) -> f64 + Sync,
{
    debug!(
        rows = rows.len(),
        threads = num_cpus::get(),
        %mode,
        "recomputing density altitude"
    );

    let corrected: Vec<FixResult<String>> = rows
        .par_iter()
        .enumerate()
        .map(|(i, row)| {
            let row = decode_at(i + 1, row)?;
            Ok(record_codec::encode(&row, model(&row)))
        })
        .collect();

    // Sequential collect so the reported error is the first bad row by position.
    corrected.into_iter().collect()
}

fn unwrap_offsets(rows: &[&str], config: &UnwrapConfig) -> FixResult<(Vec<String>, Unwrapped)> {
    let unwrapper = OverflowUnwrapper::new(*config)?;

    let decoded = rows
        .iter()
        .enumerate()
        .map(|(i, row)| decode_at(i + 1, row))
        .collect::<FixResult<Vec<_>>>()?;

    let raw = decoded
        .iter()
        .enumerate()
        .map(|(i, row)| row.raw_altitude_ft().map_err(|e| e.at_line(i + 1)))
        .collect::<FixResult<Vec<_>>>()?;

    let unwrapped = unwrapper.unwrap(&raw);
    // Rows outside any wrap keep their recorded text.
    let corrected = decoded
        .iter()
        .zip(unwrapped.altitudes_ft.iter().zip(&unwrapped.depths))
        .map(|(row, (&altitude, &depth))| {
            if depth == 0 {
                record_codec::encode_text(row, row.raw_altitude())
            } else {
                record_codec::encode(row, altitude)
            }
        })
        .collect();

    Ok((corrected, unwrapped))
}

/// Correct data rows (header already removed), also returning row and wrap statistics.
pub fn correct_with_stats<S: AsRef<str>>(
    rows: &[S],
    mode: CorrectionMode,
    config: &UnwrapConfig,
) -> FixResult<(Vec<String>, CorrectionStats)> {
    let rows: Vec<&str> = rows.iter().map(|r| r.as_ref()).collect();

    let (corrected, unwrapped) = match mode {
        CorrectionMode::DryAir => {
            let corrected = recompute(&rows, mode, |row| {
                density_altitude::dry_air(row.temp_f, row.press_inhg)
            })?;
            (corrected, None)
        }
        CorrectionMode::WetAir => {
            let corrected = recompute(&rows, mode, |row| {
                density_altitude::wet_air(row.temp_f, row.press_inhg, row.dew_point_f)
            })?;
            (corrected, None)
        }
        CorrectionMode::Offset => {
            let (corrected, unwrapped) = unwrap_offsets(&rows, config)?;
            (corrected, Some(unwrapped))
        }
    };

    let stats = match unwrapped {
        Some(unwrapped) => CorrectionStats {
            rows: corrected.len(),
            max_wrap_depth: unwrapped.max_depth(),
            wrap_events: unwrapped.events,
        },
        None => CorrectionStats {
            rows: corrected.len(),
            ..CorrectionStats::default()
        },
    };
    Ok((corrected, stats))
}

/// Correct data rows (header already removed), returning only the corrected rows.
pub fn correct<S: AsRef<str>>(
    rows: &[S],
    mode: CorrectionMode,
    config: &UnwrapConfig,
) -> FixResult<Vec<String>> {
    correct_with_stats(rows, mode, config).map(|(rows, _)| rows)
}

/// Correct a whole document, passing the header through untouched.
pub fn correct_document_with_stats(
    text: &str,
    mode: CorrectionMode,
    config: &UnwrapConfig,
) -> FixResult<(String, CorrectionStats)> {
    let lines: Vec<&str> = text.lines().collect();
    let split = lines.len().min(N_HEADER_LINES);
    let (header, body) = lines.split_at(split);

    let (corrected, stats) = correct_with_stats(body, mode, config)?;

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(header);
    out.extend(corrected.iter().map(String::as_str));
    Ok((out.join("\n"), stats))
}

pub fn correct_document(text: &str, mode: CorrectionMode, config: &UnwrapConfig) -> FixResult<String> {
    correct_document_with_stats(text, mode, config).map(|(text, _)| text)
}
