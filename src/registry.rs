//! Asset registry and price sources
//!
//! Maps each supported asset symbol to exactly one price source. Readings
//! are bounds-checked both when a source is registered and on every lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::error::{Error, Result};
use crate::settlement::{Price, PRICE_CEILING};

/// Handle to an external price feed for one asset.
///
/// `latest` is read exactly once per lookup: the same value that passes the
/// bounds check is the value the engine uses.
pub trait PriceSource: Send + Sync {
    /// Source identifier, carried in price-source-changed events
    fn id(&self) -> &str;
    /// Latest reading, 18-decimal fixed point
    fn latest(&self) -> Price;
}

impl std::fmt::Debug for dyn PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceSource").field("id", &self.id()).finish()
    }
}

/// In-memory price source with a settable reading
pub struct StaticPriceSource {
    id: String,
    price: RwLock<Price>,
}

impl StaticPriceSource {
    /// Create a source reporting `price` until changed
    pub fn new(id: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            price: RwLock::new(price),
        }
    }

    /// Update the reported price
    pub fn set_price(&self, price: Price) {
        *self.price.write() = price;
    }
}

impl PriceSource for StaticPriceSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn latest(&self) -> Price {
        *self.price.read()
    }
}

/// Registry of supported assets and their price sources
#[derive(Default)]
pub struct AssetRegistry {
    sources: BTreeMap<String, Arc<dyn PriceSource>>,
}

impl AssetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` for `asset`, replacing any previous source.
    ///
    /// The source's current reading must already be within bounds.
    pub fn register(&mut self, asset: impl Into<String>, source: Arc<dyn PriceSource>) -> Result<()> {
        check_bounds(source.latest())?;
        let asset = asset.into();
        info!(asset = %asset, source = source.id(), "price source registered");
        self.sources.insert(asset, source);
        Ok(())
    }

    /// Remove the source for `asset`, returning it
    pub fn deregister(&mut self, asset: &str) -> Result<Arc<dyn PriceSource>> {
        self.sources
            .remove(asset)
            .ok_or_else(|| Error::UnknownAsset(asset.to_string()))
    }

    /// Whether `asset` has a registered source
    pub fn is_registered(&self, asset: &str) -> bool {
        self.sources.contains_key(asset)
    }

    /// Current price for `asset`: a single bounds-checked read
    pub fn current_price(&self, asset: &str) -> Result<Price> {
        let source = self
            .sources
            .get(asset)
            .ok_or_else(|| Error::MissingPriceSource(asset.to_string()))?;
        let price = source.latest();
        check_bounds(price)?;
        Ok(price)
    }

    /// Registered asset symbols, in sorted order
    pub fn supported_assets(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }
}

fn check_bounds(price: Price) -> Result<()> {
    if price == 0 || price > PRICE_CEILING {
        return Err(Error::PriceOutOfBounds(price));
    }
    Ok(())
}
