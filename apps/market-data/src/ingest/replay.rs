//! Replay files: tick records stored back to back with no framing.

use std::path::Path;

use tracing::debug;

use crate::codec::{RECORD_LENGTH, TickRecord};
use crate::error::{MarketDataError, Result};

/// Read every record from a replay file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `InvalidArgument` if its
/// length is not a whole number of records.
pub async fn read_replay_file(path: impl AsRef<Path>) -> Result<Vec<TickRecord>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    if bytes.len() % RECORD_LENGTH != 0 {
        return Err(MarketDataError::invalid_argument(format!(
            "{}: {} bytes is not a multiple of the {RECORD_LENGTH}-byte record length",
            path.display(),
            bytes.len()
        )));
    }

    let records = bytes
        .chunks_exact(RECORD_LENGTH)
        .map(TickRecord::from_bytes)
        .collect::<Result<Vec<_>>>()?;
    debug!(path = %path.display(), records = records.len(), "replay file read");
    Ok(records)
}

/// Write records back to back.
///
/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub async fn write_replay_file(path: impl AsRef<Path>, records: &[TickRecord]) -> Result<()> {
    let bytes: Vec<u8> = records
        .iter()
        .flat_map(|record| record.as_bytes().iter().copied())
        .collect();
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InternalTimestamp, SymbolCode};

    #[tokio::test]
    async fn records_survive_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticks.bin");
        let records: Vec<TickRecord> = (0..3)
            .map(|i| {
                TickRecord::from_fields(
                    InternalTimestamp::from_millis(i * 1_000),
                    SymbolCode::new(1),
                    10_000 + i,
                    100,
                )
            })
            .collect();

        write_replay_file(&path, &records).await.unwrap();
        let read = read_replay_file(&path).await.unwrap();

        assert_eq!(read, records);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            (3 * RECORD_LENGTH) as u64
        );
    }

    #[tokio::test]
    async fn truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticks.bin");
        std::fs::write(&path, [0_u8; RECORD_LENGTH + 3]).unwrap();

        assert!(matches!(
            read_replay_file(&path).await,
            Err(MarketDataError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            read_replay_file(dir.path().join("absent.bin")).await,
            Err(MarketDataError::Io(_))
        ));
    }
}
