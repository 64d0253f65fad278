//! Symbol codes and the symbol dictionary port.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MarketDataError, Result};

/// Compact integer substitute for a symbol name.
///
/// Unique per symbol within one dictionary generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolCode(u16);

impl SymbolCode {
    /// Create a symbol code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Raw code value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bidirectional symbol name / code lookup.
///
/// Supplied by reference-data management; the codec only borrows it.
pub trait SymbolDictionary: Send + Sync {
    /// Forward lookup.
    fn code_of(&self, symbol: &str) -> Option<SymbolCode>;

    /// Reverse lookup.
    fn symbol_of(&self, code: SymbolCode) -> Option<&str>;
}

/// Hash-map backed dictionary.
#[derive(Debug, Clone, Default)]
pub struct InMemorySymbolDictionary {
    codes: HashMap<String, SymbolCode>,
    symbols: HashMap<SymbolCode, String>,
}

impl InMemorySymbolDictionary {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary assigning codes by position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` on duplicate symbols or when there are more
    /// symbols than 16-bit codes.
    pub fn from_symbols<I, S>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dictionary = Self::new();
        for (index, symbol) in symbols.into_iter().enumerate() {
            let code = u16::try_from(index).map_err(|_| {
                MarketDataError::invalid_argument("dictionary exceeds 65536 symbols")
            })?;
            dictionary.insert(symbol, SymbolCode::new(code))?;
        }
        Ok(dictionary)
    }

    /// Register a symbol under a code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if either the symbol or the code is already taken.
    pub fn insert(&mut self, symbol: impl Into<String>, code: SymbolCode) -> Result<()> {
        let symbol = symbol.into();
        if let Some(existing) = self.codes.get(&symbol) {
            return Err(MarketDataError::invalid_argument(format!(
                "symbol '{symbol}' already mapped to code {existing}"
            )));
        }
        if let Some(existing) = self.symbols.get(&code) {
            return Err(MarketDataError::invalid_argument(format!(
                "code {code} already mapped to symbol '{existing}'"
            )));
        }
        self.codes.insert(symbol.clone(), code);
        self.symbols.insert(code, symbol);
        Ok(())
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl SymbolDictionary for InMemorySymbolDictionary {
    fn code_of(&self, symbol: &str) -> Option<SymbolCode> {
        self.codes.get(symbol).copied()
    }

    fn symbol_of(&self, code: SymbolCode) -> Option<&str> {
        self.symbols.get(&code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_assigned_by_position() {
        let dictionary = InMemorySymbolDictionary::from_symbols(["AAPL", "MSFT"]).unwrap();

        assert_eq!(dictionary.code_of("MSFT"), Some(SymbolCode::new(1)));
        assert_eq!(dictionary.symbol_of(SymbolCode::new(0)), Some("AAPL"));
        assert_eq!(dictionary.code_of("GOOGL"), None);
        assert_eq!(dictionary.len(), 2);
    }

    #[test]
    fn duplicate_symbol_is_rejected() {
        let result = InMemorySymbolDictionary::from_symbols(["AAPL", "AAPL"]);
        assert!(matches!(result, Err(MarketDataError::InvalidArgument(_))));
    }

    #[test]
    fn reused_code_is_rejected() {
        let mut dictionary = InMemorySymbolDictionary::new();
        dictionary.insert("AAPL", SymbolCode::new(3)).unwrap();

        let result = dictionary.insert("MSFT", SymbolCode::new(3));

        assert!(result.is_err());
        assert_eq!(dictionary.symbol_of(SymbolCode::new(3)), Some("AAPL"));
    }
}
