//! Port interfaces for the ingestion pipeline
//!
//! Ports define the contract between the use cases in `ds-app` and the
//! adapters in `ds-infra`. Core types never depend on an adapter.

mod byte_source;
mod byte_store;
pub mod classifier;
mod clock;
mod enricher;
mod http;
mod persistence;
mod render;
mod url_payload;

pub use byte_source::ByteSourcePort;
pub use byte_store::ByteStorePort;
pub use classifier::{
    Classification, ClassificationError, ClassifyOptions, ContentClassifierPort, IconProposal,
    IconSource, RenderedIcon,
};
pub use clock::ClockPort;
pub use enricher::{EnrichedPreview, FetchedIcon, UrlEnricherPort};
pub use http::{HttpResponse, HttpTransportPort};
pub use persistence::ItemPersistencePort;
pub use render::{IconRendererPort, PdfPreview, PdfRendererPort};
pub use url_payload::UrlPayloadPort;
