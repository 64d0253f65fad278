//! Symbol dictionary configuration.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::domain::InMemorySymbolDictionary;

/// Ordered symbol list; codes are assigned by position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Symbols.
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl DictionaryConfig {
    /// Build the dictionary.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` on blank or duplicate symbols, or more
    /// symbols than 16-bit codes.
    pub fn build(&self) -> Result<InMemorySymbolDictionary, ConfigError> {
        if let Some(blank) = self.symbols.iter().position(|s| s.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "dictionary.symbols[{blank}] is blank"
            )));
        }
        InMemorySymbolDictionary::from_symbols(self.symbols.iter().map(|s| s.trim().to_string()))
            .map_err(|e| ConfigError::ValidationError(format!("dictionary.symbols: {e}")))
    }
}
