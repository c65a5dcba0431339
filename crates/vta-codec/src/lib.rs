//! VTA Codec
//!
//! Lossless conversion between compiled visual tree assets and UXML text.
//!
//! # Example
//! ```rust,ignore
//! use vta_codec::{Codec, Config};
//!
//! let codec = Codec::new(Config::default());
//! let text = codec.export_text(&asset)?.value;
//! let rebuilt = codec.import_text(&text, Some(&asset))?.value;
//! ```

mod config;
mod error;
mod exporter;
mod importer;
mod sheet;

pub use config::{Config, ConfigError};
pub use error::{Failure, Outcome, Report, TransformError, Warning};
pub use exporter::Exporter;
pub use importer::Importer;
pub use sheet::{SheetBuilder, SheetDecoder, Tables};

// Re-export sub-crates for advanced usage
pub use vta_asset as asset;
pub use vta_dom as dom;
pub use vta_markup as markup;
pub use vta_style as style;

use vta_asset::BinaryAsset;
use vta_dom::Document;
use vta_markup::{RenderOptions, UxmlParser, UxmlRenderer};

/// Codec version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Converter bound to one configuration
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: Config,
}

impl Codec {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binary asset to Document
    pub fn export(&self, asset: &BinaryAsset) -> Outcome<Document> {
        Exporter::new(asset).export()
    }

    /// Document to UXML text
    pub fn render(&self, document: &Document) -> String {
        UxmlRenderer::new(self.render_options()).render(document)
    }

    /// UXML text to Document. Style diagnostics found before a markup error
    /// travel with the failure.
    pub fn parse(&self, text: &str) -> Outcome<Document> {
        let mut diagnostics = Vec::new();
        let result = UxmlParser::new().parse_into(text, &mut diagnostics);
        let warnings = diagnostics.into_iter().map(Warning::from).collect();
        match result {
            Ok(document) => Ok(Report::new(document, warnings)),
            Err(error) => {
                tracing::debug!("Markup rejected: {}", error);
                Err(Failure::new(error, warnings))
            }
        }
    }

    /// Document to binary asset, taking bookkeeping from `base` when given
    pub fn build_binary_asset(&self, document: &Document, base: Option<&BinaryAsset>) -> Outcome<BinaryAsset> {
        Importer::new(document, base, &self.config).import()
    }

    /// Binary asset straight to UXML text
    pub fn export_text(&self, asset: &BinaryAsset) -> Outcome<String> {
        Ok(self.export(asset)?.map(|document| self.render(&document)))
    }

    /// UXML text straight to a binary asset
    pub fn import_text(&self, text: &str, base: Option<&BinaryAsset>) -> Outcome<BinaryAsset> {
        let parsed = self.parse(text)?;
        let mut warnings = parsed.warnings;
        match self.build_binary_asset(&parsed.value, base) {
            Ok(built) => {
                warnings.extend(built.warnings);
                Ok(Report::new(built.value, warnings))
            }
            Err(failure) => {
                warnings.extend(failure.warnings);
                Err(Failure { error: failure.error, warnings })
            }
        }
    }

    fn render_options(&self) -> RenderOptions {
        self.config.render_options()
    }
}

/// Binary asset to Document with the default configuration
pub fn export(asset: &BinaryAsset) -> Outcome<Document> {
    exporter::export(asset)
}

/// Document to UXML text with the default configuration
pub fn render(document: &Document) -> String {
    Codec::default().render(document)
}

/// UXML text to Document
pub fn parse(text: &str) -> Outcome<Document> {
    Codec::default().parse(text)
}

/// Document to binary asset with the default configuration
pub fn build_binary_asset(document: &Document, base: Option<&BinaryAsset>) -> Outcome<BinaryAsset> {
    importer::build_binary_asset(document, base, &Config::default())
}
