//! Per-cycle observation output
//!
//! One line per matched process and one announcement before each kill.
//! Lines go to any `Write` so tests can capture them; colour is applied
//! with crossterm only when enabled.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use humantime::format_duration;

use crate::constants::{
    BUDGET_CRITICAL_PERCENT, BUDGET_MODERATE_PERCENT, BUDGET_WARNING_PERCENT,
};
use crate::system::{CpuTimeSample, ProcessRecord};

/// Returns a colour for how much of the CPU-time budget a sample has used.
///
/// # Color Thresholds
/// * Red - at or above 80% of the threshold
/// * Yellow - at or above 50%
/// * Cyan - at or above 20%
/// * Green - below 20%
#[must_use]
pub fn budget_color(total: Duration, threshold: Duration) -> Color {
    if threshold.is_zero() {
        return Color::Red;
    }
    let percent = total.as_secs_f64() / threshold.as_secs_f64() * 100.0;
    if percent >= BUDGET_CRITICAL_PERCENT {
        Color::Red
    } else if percent >= BUDGET_WARNING_PERCENT {
        Color::Yellow
    } else if percent >= BUDGET_MODERATE_PERCENT {
        Color::Cyan
    } else {
        Color::Green
    }
}

/// Formats the observation line for one sampled process
#[must_use]
pub fn format_sample(record: &ProcessRecord, sample: &CpuTimeSample) -> String {
    format!(
        "{} user {} system {} total {}",
        record,
        format_duration(sample.user_time),
        format_duration(sample.system_time),
        format_duration(sample.total()),
    )
}

pub struct Reporter<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn sample(
        &mut self,
        record: &ProcessRecord,
        sample: &CpuTimeSample,
        threshold: Duration,
    ) -> io::Result<()> {
        let line = format_sample(record, sample);
        self.line(&line, budget_color(sample.total(), threshold))
    }

    pub fn killing(&mut self, record: &ProcessRecord, dry_run: bool) -> io::Result<()> {
        let line = if dry_run {
            format!("Would kill process {}", record)
        } else {
            format!("Killing process {}", record)
        };
        self.line(&line, Color::Red)
    }

    fn line(&mut self, text: &str, color: Color) -> io::Result<()> {
        if self.color {
            queue!(
                self.out,
                SetForegroundColor(color),
                Print(text),
                ResetColor,
                Print("\n")
            )?;
        } else {
            writeln!(self.out, "{}", text)?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
