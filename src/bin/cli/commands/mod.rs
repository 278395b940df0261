pub mod backfill;
pub mod import;
pub mod migrate;
pub mod search;
pub mod show;
