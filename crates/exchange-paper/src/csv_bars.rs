//! Bar files in `timestamp,symbol,open,high,low,close,volume` layout.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use orbfib_core::Bar;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Loads bars from a CSV file with a header row, sorted by timestamp.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be opened
/// - A row has fewer than seven columns
/// - Timestamp or price parsing fails
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    let mut bars = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Bad CSV record at row {}", line + 1))?;
        if record.len() < 7 {
            anyhow::bail!("Row {} has {} columns, expected 7", line + 1, record.len());
        }
        let timestamp: DateTime<Utc> = record[0]
            .parse()
            .with_context(|| format!("Bad timestamp '{}' at row {}", &record[0], line + 1))?;
        let price = |i: usize| {
            Decimal::from_str(record[i].trim())
                .with_context(|| format!("Bad price '{}' at row {}", &record[i], line + 1))
        };
        let volume = price(6)?.trunc().to_u64().unwrap_or(0);

        bars.push(Bar::new(timestamp, price(2)?, price(3)?, price(4)?, price(5)?, volume));
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn loads_and_sorts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,symbol,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-01-05T14:35:00Z,SPY,100.5,101,100,100.8,1200").unwrap();
        writeln!(file, "2024-01-05T14:30:00Z,SPY,100,100.6,99.8,100.5,1500.0").unwrap();

        let bars = load_bars_csv(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(100.5));
        assert_eq!(bars[0].volume, 1500);
        assert_eq!(bars[1].high, dec!(101));
    }

    #[test]
    fn rejects_bad_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,symbol,open,high,low,close,volume").unwrap();
        writeln!(file, "yesterday,SPY,1,1,1,1,1").unwrap();
        assert!(load_bars_csv(file.path()).is_err());
        assert!(load_bars_csv(Path::new("/nonexistent/bars.csv")).is_err());
    }
}
