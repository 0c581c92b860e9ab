//! Data sources, alignment and export.

pub mod align;
pub mod csv_provider;
pub mod export;
pub mod memory;
pub mod provider;
pub mod synthetic;

pub use align::merge_prefixed;
pub use csv_provider::CsvProvider;
pub use export::{read_parquet, to_dataframe, write_csv, write_parquet, write_table};
pub use memory::InMemoryProvider;
pub use provider::{DataError, DataProvider, DownloadOptions, Frequency, HistoryRange, RawBar};
pub use synthetic::SyntheticProvider;
