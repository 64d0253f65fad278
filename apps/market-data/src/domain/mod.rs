//! Domain value objects shared by the codec, bars, charts and ingestion.

pub mod clock;
pub mod price;
pub mod symbol;
pub mod tick;

pub use clock::{InternalClock, InternalTimestamp};
pub use price::{cents_to_price, price_to_cents};
pub use symbol::{InMemorySymbolDictionary, SymbolCode, SymbolDictionary};
pub use tick::Tick;
