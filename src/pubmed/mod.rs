//! NCBI E-utilities integration: identifier search, metadata, PMC cross-references and efetch.

pub mod client;
pub mod types;

pub use client::{LiteratureIndex, PubMedClient};
pub use types::{
    AbstractDocument, DEFAULT_SOURCE_NAME, MISSING_PUBLICATION_DATE, MISSING_TITLE, Metadata,
    PubMedError,
};
#[cfg(test)]
pub(crate) mod testing;
