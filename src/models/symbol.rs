use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_SYMBOL_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("ticker is empty")]
    Empty,
    #[error("ticker '{0}' is longer than 10 characters")]
    TooLong(String),
    #[error("ticker '{0}' may only contain letters, digits, '.' or '-'")]
    InvalidChar(String),
}

/// Uppercase ticker symbol, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let ticker = raw.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return Err(SymbolError::Empty);
        }
        if ticker.chars().count() > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong(ticker));
        }
        if !ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(SymbolError::InvalidChar(ticker));
        }
        Ok(Self(ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let symbol = Symbol::parse("  brk.b ").unwrap();
        assert_eq!(symbol.as_str(), "BRK.B");
        assert_eq!(Symbol::parse("rds-a").unwrap().to_string(), "RDS-A");
    }

    #[test]
    fn rejects_bad_tickers() {
        assert_eq!(Symbol::parse("   "), Err(SymbolError::Empty));
        assert!(matches!(
            Symbol::parse("ABCDEFGHIJK"),
            Err(SymbolError::TooLong(_))
        ));
        assert!(matches!(
            Symbol::parse("AA PL"),
            Err(SymbolError::InvalidChar(_))
        ));
        assert!(matches!(
            Symbol::parse("$AAPL"),
            Err(SymbolError::InvalidChar(_))
        ));
    }

    #[test]
    fn deserializes_through_validation() {
        let symbol: Symbol = serde_json::from_str("\"msft\"").unwrap();
        assert_eq!(symbol.as_str(), "MSFT");
        assert!(serde_json::from_str::<Symbol>("\"not a ticker\"").is_err());
    }
}
