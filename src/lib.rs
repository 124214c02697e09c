pub mod batch;
pub mod config;
pub mod destination;
pub mod fetcher;
pub mod policy;
pub mod report;
pub mod source;
pub mod transport;

pub use destination::Destination;
pub use fetcher::{AssetFetcher, FetchError, FetchOptions, FetchOutcome};
pub use policy::AcceptancePolicy;
pub use source::{Source, SourceList};

pub type Result<T> = anyhow::Result<T>;
