//! Url enrichment: page title and preview icon for dropped web links.

pub mod enricher;
pub mod html;
pub mod transport;

pub use enricher::HtmlUrlEnricher;
pub use html::{parse_page, PageMetadata};
pub use transport::ReqwestTransport;
