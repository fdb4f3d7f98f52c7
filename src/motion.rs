//! Per-frame sub-pixel translations.
//!
//! A [`MotionShiftSequence`] is stored on disk as plain text with one
//! `dx dy` pair per line.
use crate::error::{Error, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Translation of one frame relative to the high-resolution reference, in
/// high-resolution pixels. Positive `dx` moves content right, positive `dy`
/// moves it down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionShift {
    pub dx: f64,
    pub dy: f64,
}

impl MotionShift {
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Largest absolute component.
    pub fn max_abs(&self) -> f64 {
        self.dx.abs().max(self.dy.abs())
    }
}

impl From<(f64, f64)> for MotionShift {
    fn from((dx, dy): (f64, f64)) -> Self {
        Self::new(dx, dy)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MotionShiftSequence {
    shifts: Vec<MotionShift>,
}

impl MotionShiftSequence {
    pub fn new(shifts: Vec<MotionShift>) -> Self {
        Self { shifts }
    }

    /// Replace the stored shifts.
    pub fn set_shifts(&mut self, shifts: Vec<MotionShift>) {
        self.shifts = shifts;
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    pub fn shifts(&self) -> &[MotionShift] {
        &self.shifts
    }

    /// Shift of frame `index`. Indices past the end are an error.
    pub fn get(&self, index: usize) -> Result<MotionShift> {
        self.shifts
            .get(index)
            .copied()
            .ok_or(Error::MotionIndexOutOfRange {
                index,
                len: self.shifts.len(),
            })
    }

    /// Largest absolute shift component across the sequence.
    pub fn max_abs_shift(&self) -> f64 {
        self.shifts
            .iter()
            .map(MotionShift::max_abs)
            .fold(0.0, f64::max)
    }

    /// Parse `dx dy` lines. Blank lines and lines starting with `#` are skipped;
    /// non-finite shifts are malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let mut shifts = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let malformed = || Error::MotionParse {
                line: line_no + 1,
                content: line.to_string(),
            };
            let mut fields = trimmed.split_whitespace();
            let dx = fields.next().and_then(|s| s.parse::<f64>().ok());
            let dy = fields.next().and_then(|s| s.parse::<f64>().ok());
            match (dx, dy, fields.next()) {
                (Some(dx), Some(dy), None) if dx.is_finite() && dy.is_finite() => {
                    shifts.push(MotionShift::new(dx, dy))
                }
                _ => return Err(malformed()),
            }
        }
        Ok(Self { shifts })
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for shift in &self.shifts {
            let _ = writeln!(out, "{} {}", shift.dx, shift.dy);
        }
        out
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let sequence = Self::parse(&text)?;
        info!(
            "Loaded {} motion shifts from {}",
            sequence.len(),
            path.display()
        );
        Ok(sequence)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_text()).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote {} motion shifts to {}", self.len(), path.display());
        Ok(())
    }
}

impl From<Vec<MotionShift>> for MotionShiftSequence {
    fn from(shifts: Vec<MotionShift>) -> Self {
        Self::new(shifts)
    }
}

impl FromIterator<(f64, f64)> for MotionShiftSequence {
    fn from_iter<T: IntoIterator<Item = (f64, f64)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(MotionShift::from).collect())
    }
}
