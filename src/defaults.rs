//! Fixed pipeline constants.

/// Maximum number of projected rows submitted to the import endpoint per batch.
pub const IMPORT_BATCH_CAP: usize = 3000;

/// Share of the progress bar consumed by the batch loop; the remainder is
/// reserved for post-processing after the last batch returns.
pub const PROGRESS_NETWORK_SHARE: u8 = 90;

/// How many identifiers / row errors a summary shows before truncating.
pub const SUMMARY_PREVIEW_LEN: usize = 5;
