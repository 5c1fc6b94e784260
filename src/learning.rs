//! Adaptive usage-learning matrix.
//!
//! A 7 × 48 grid of `u8` weights, one cell per (weekday, half-hour slot).
//! Confirmed draws reinforce the cell for "now"; once per calendar day every
//! cell is multiplied by a decay factor so stale habits fade. A cell at or
//! above the schedule threshold makes the schedule evaluator pre-heat.
//!
//! ```text
//!            slot 0 (00:00)  …  slot 12 (06:00)  …  slot 47 (23:30)
//!  Mon  [0]        0                 80                    0
//!  …
//!  Sun  [6]        0                  0                    0
//! ```
//!
//! ## Persistence record
//!
//! | Offset | Size | Content                                   |
//! |--------|------|-------------------------------------------|
//! | 0      | 336  | cells, weekday-major                      |
//! | 336    | 4    | additive checksum of all cells, LE `u32`  |
//!
//! The checksum cannot detect cells that were swapped with each other;
//! it guards against truncated or zeroed flash pages only.

use core::fmt::Write as _;

use log::info;

use crate::clock::{SLOTS_PER_DAY, WEEKDAYS, WEEKDAY_NAMES};
use crate::error::{Error, Result};

/// Number of cells in the grid.
pub const CELL_COUNT: usize = WEEKDAYS * SLOTS_PER_DAY;

/// Size of the persisted record in bytes.
pub const RECORD_LEN: usize = CELL_COUNT + 4;

/// One rendered log row: a weekday label followed by 24 three-digit cells.
pub type MatrixRow = heapless::String<128>;

/// Seed weights for Monday–Friday: (slot, weight).
const WEEKDAY_SEED: [(usize, u8); 12] = [
    (12, 80),  // 06:00 morning shower
    (13, 120), // 06:30
    (14, 120), // 07:00
    (15, 100), // 07:30
    (16, 80),  // 08:00
    (23, 80),  // 11:30 lunch
    (24, 100), // 12:00
    (25, 80),  // 12:30
    (36, 100), // 18:00 dinner
    (37, 100), // 18:30
    (42, 100), // 21:00 evening bath
    (43, 80),  // 21:30
];

/// Seed weights for Saturday–Sunday (later mornings).
const WEEKEND_SEED: [(usize, u8); 10] = [
    (16, 80),  // 08:00
    (17, 100), // 08:30
    (18, 100), // 09:00
    (19, 80),  // 09:30
    (24, 100), // 12:00
    (25, 80),  // 12:30
    (37, 100), // 18:30
    (38, 80),  // 19:00
    (42, 100), // 21:00
    (43, 80),  // 21:30
];

/// The 7 × 48 usage grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningMatrix {
    cells: [[u8; SLOTS_PER_DAY]; WEEKDAYS],
}

impl Default for LearningMatrix {
    fn default() -> Self {
        Self::seeded()
    }
}

impl LearningMatrix {
    /// An all-zero grid.
    pub fn zeroed() -> Self {
        Self {
            cells: [[0; SLOTS_PER_DAY]; WEEKDAYS],
        }
    }

    /// The built-in "typical household" pattern used when nothing valid is stored.
    pub fn seeded() -> Self {
        let mut m = Self::zeroed();
        for day in &mut m.cells[..5] {
            for &(slot, weight) in &WEEKDAY_SEED {
                day[slot] = weight;
            }
        }
        for day in &mut m.cells[5..] {
            for &(slot, weight) in &WEEKEND_SEED {
                day[slot] = weight;
            }
        }
        m
    }

    /// Discard everything learned and return to the seed pattern.
    pub fn reset_to_seed(&mut self) {
        *self = Self::seeded();
        info!("Learning matrix reset to typical daily pattern");
    }

    /// Weight of a single cell. Indices are clamped into the grid.
    pub fn get(&self, weekday: usize, slot: usize) -> u8 {
        let (d, s) = Self::clamp(weekday, slot);
        self.cells[d][s]
    }

    /// Add `increment` to a cell, saturating at 255. Returns the new weight.
    pub fn reinforce(&mut self, weekday: usize, slot: usize, increment: u8) -> u8 {
        let (d, s) = Self::clamp(weekday, slot);
        let cell = &mut self.cells[d][s];
        *cell = cell.saturating_add(increment);
        *cell
    }

    /// Multiply every cell by `factor`, round to nearest and re-clamp.
    pub fn decay(&mut self, factor: f32) {
        for cell in self.cells.iter_mut().flatten() {
            let scaled = (f32::from(*cell) * factor).round();
            *cell = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    /// Whether a cell has reached the schedule threshold.
    pub fn threshold_met(&self, weekday: usize, slot: usize, threshold: u8) -> bool {
        self.get(weekday, slot) >= threshold
    }

    /// Additive checksum of every cell.
    pub fn checksum(&self) -> u32 {
        self.cells.iter().flatten().map(|&c| u32::from(c)).sum()
    }

    // ── Persistence record ───────────────────────────────────

    /// Encode the grid and its checksum into the fixed record layout.
    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        for (dst, src) in out[..CELL_COUNT].iter_mut().zip(self.cells.iter().flatten()) {
            *dst = *src;
        }
        out[CELL_COUNT..].copy_from_slice(&self.checksum().to_le_bytes());
        out
    }

    /// Decode a stored record, validating its length and checksum.
    pub fn from_record(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_LEN {
            return Err(Error::RecordLength {
                expected: RECORD_LEN,
                found: bytes.len(),
            });
        }

        let mut m = Self::zeroed();
        for (dst, src) in m.cells.iter_mut().flatten().zip(&bytes[..CELL_COUNT]) {
            *dst = *src;
        }

        let mut stored = [0u8; 4];
        stored.copy_from_slice(&bytes[CELL_COUNT..]);
        let found = u32::from_le_bytes(stored);
        let expected = m.checksum();
        if found != expected {
            return Err(Error::ChecksumMismatch { expected, found });
        }
        Ok(m)
    }

    // ── Diagnostics ──────────────────────────────────────────

    /// Render the grid as 14 log rows: `Mon-AM:` (slots 0–23) and
    /// `Mon-PM:` (slots 24–47) for every weekday.
    pub fn render_rows(&self) -> impl Iterator<Item = MatrixRow> + '_ {
        self.cells.iter().enumerate().flat_map(|(d, day)| {
            [("AM", &day[..24]), ("PM", &day[24..])]
                .into_iter()
                .map(move |(half, cells)| {
                    let mut row = MatrixRow::new();
                    // 7 + 24 × 4 = 103 chars, always fits.
                    let _ = write!(row, "{}-{}:", WEEKDAY_NAMES[d], half);
                    for c in cells {
                        let _ = write!(row, " {c:3}");
                    }
                    row
                })
        })
    }

    fn clamp(weekday: usize, slot: usize) -> (usize, usize) {
        (weekday.min(WEEKDAYS - 1), slot.min(SLOTS_PER_DAY - 1))
    }
}

// ---------------------------------------------------------------------------
// Daily decay bookkeeping
// ---------------------------------------------------------------------------

/// Tracks the calendar day on which decay last ran.
///
/// The first observed day is only recorded, so a reboot never decays the
/// matrix on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayClock {
    last_day: Option<u16>,
}

impl DecayClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current day if none is known yet. Called on every tick
    /// with a valid clock, even while decay itself is suppressed.
    pub fn prime(&mut self, day_of_year: u16) {
        if self.last_day.is_none() {
            self.last_day = Some(day_of_year);
            info!("Decay day initialised to {} (no decay on boot)", day_of_year);
        }
    }

    /// Returns `true` exactly once per distinct `day_of_year` after the first.
    pub fn is_due(&mut self, day_of_year: u16) -> bool {
        match self.last_day {
            None => {
                self.last_day = Some(day_of_year);
                info!("Decay day initialised to {} (no decay on boot)", day_of_year);
                false
            }
            Some(last) if last == day_of_year => false,
            Some(_) => {
                self.last_day = Some(day_of_year);
                true
            }
        }
    }
}
