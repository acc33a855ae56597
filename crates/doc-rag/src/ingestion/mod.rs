//! File intake: type resolution, loading and temp upload storage

mod dispatcher;
pub mod loaders;
mod resolver;
pub mod upload;

pub use dispatcher::IngestionDispatcher;
pub use loaders::{
    CsvLoader, DocumentLoader, LoaderRegistry, PdfLoader, SpreadsheetLoader, TextLoader,
    WordLoader,
};
pub use resolver::{sniff_bytes, sniff_file, TypeResolver};
pub use upload::{save_stream, temp_path, TempUpload};
