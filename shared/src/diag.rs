//! Operation diagnostics: success/failure log lines, elapsed time and heap
//! usage around each signing operation.
//!
//! Logging goes through `defmt-or-log`, so the same call sites serve hosted
//! builds (`log`) and deferred-formatting embedded builds (`defmt`), and cost
//! nothing when neither backend is selected.

use core::fmt;

use defmt_or_log::{error, info};

use crate::meter;

/// Log the per-operation success line the facade emits.
pub fn log_success(op: &str) {
    info!("> {} successful.", op);
}

/// Log the per-operation failure line with its status code.
pub fn log_error(op: &str, status: i32) {
    error!("> {} failed with status {}.", op, status);
}

/// Measures one operation: wall time (with the `std` feature; zero without a
/// clock) and the net heap delta reported by [`meter`].
pub struct OpMeter {
    op: &'static str,
    heap_start: usize,
    #[cfg(feature = "std")]
    started: std::time::Instant,
}

impl OpMeter {
    pub fn start(op: &'static str) -> Self {
        OpMeter {
            op,
            heap_start: meter::currently_allocated(),
            #[cfg(feature = "std")]
            started: std::time::Instant::now(),
        }
    }

    pub fn finish(self) -> OpReport {
        #[cfg(feature = "std")]
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        #[cfg(not(feature = "std"))]
        let elapsed_ms = 0;
        let heap_end = meter::currently_allocated();
        OpReport {
            op: self.op,
            elapsed_ms,
            heap_delta: heap_end as isize - self.heap_start as isize,
        }
    }
}

/// What one [`OpMeter`] measured.
///
/// `heap_delta` is the net change in live heap bytes over the operation; it
/// reads zero unless the application installed [`meter::MeteredAlloc`] as its
/// global allocator, and can be negative when an operation released more than
/// it kept.
pub struct OpReport {
    pub op: &'static str,
    pub elapsed_ms: u64,
    pub heap_delta: isize,
}

impl OpReport {
    pub fn log(&self) {
        info!("> {} elapsed time: {} ms.", self.op, self.elapsed_ms);
        info!("> {} used memory: {} bytes.", self.op, self.heap_delta);
    }
}

/// Borrowing hex adapter for digests and signatures in test output and
/// examples. Formats as lowercase hex with no separators.
pub struct Hex<'a>(pub &'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Hex<'_> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=[u8]:x}", self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_formats_lowercase_without_separators() {
        assert_eq!(format!("{}", Hex(&[0x0f, 0xa0, 0x00, 0xff])), "0fa000ff");
        assert_eq!(format!("{}", Hex(&[])), "");
        assert_eq!(format!("{:?}", Hex(&[0xab])), "ab");
    }

    #[test]
    fn meter_reports_are_well_formed() {
        let meter = OpMeter::start("noop");
        let report = meter.finish();
        assert_eq!(report.op, "noop");
        // Without an installed counting allocator the delta must read zero.
        assert_eq!(report.heap_delta, 0);
        report.log();
    }
}
