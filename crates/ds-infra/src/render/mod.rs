pub mod icon;
#[cfg(feature = "pdf")]
pub mod pdf;

pub use icon::ImageIconRenderer;
#[cfg(feature = "pdf")]
pub use pdf::PdfiumRenderer;
