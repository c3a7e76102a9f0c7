//! Ledger configuration with TOML file support.

use revshare_accrual::AccrualFormula;
use revshare_delegation::DelegationDefault;
use revshare_types::Address;
use revshare_utils::LogFormat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::TokenError;

/// Configuration for a revenue-sharing token ledger.
///
/// Can be loaded from a TOML file via [`LedgerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// The only address allowed to run administrator operations.
    #[serde(default)]
    pub administrator: Address,

    /// How deposits are folded into the revenue-per-token accumulator.
    #[serde(default)]
    pub accrual_formula: AccrualFormula,

    /// Where undelegated balances count for voting.
    #[serde(default)]
    pub delegation_default: DelegationDefault,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Balances minted when the ledger is created.
    #[serde(default)]
    pub genesis: Vec<GenesisAllocation>,
}

/// One initial balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    pub account: Address,
    /// Raw units. Written as a decimal string in TOML, since TOML integers
    /// stop at `i64::MAX`; plain integers are accepted on input.
    #[serde(serialize_with = "amount_to_string", deserialize_with = "amount_from_toml")]
    pub amount: u128,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_name() -> String {
    "Revenue Share Token".to_string()
}

fn default_symbol() -> String {
    "RVS".to_string()
}

fn default_decimals() -> u8 {
    18
}

fn default_log_level() -> String {
    "info".to_string()
}

fn amount_to_string<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(amount)
}

fn amount_from_toml<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(u64),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        Raw::Integer(n) => Ok(n as u128),
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl LedgerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, TokenError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TokenError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, TokenError> {
        let config: Self = toml::from_str(s).map_err(|e| TokenError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, TokenError> {
        toml::to_string_pretty(self).map_err(|e| TokenError::Config(e.to_string()))
    }

    /// Reject configurations the ledger cannot start from.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.administrator.is_zero() {
            return Err(TokenError::Config("administrator must be set".into()));
        }
        if self.genesis.iter().any(|g| g.account.is_zero()) {
            return Err(TokenError::Config("genesis allocation to the zero address".into()));
        }
        let mut total: u128 = 0;
        for allocation in &self.genesis {
            total = total
                .checked_add(allocation.amount)
                .ok_or_else(|| TokenError::Config("genesis supply overflows".into()))?;
        }
        Ok(())
    }

    /// Install the global tracing subscriber with the configured format and
    /// level. Returns `false` if one was already installed.
    pub fn init_logging(&self) -> bool {
        revshare_utils::init_logging(self.log_format, &self.log_level)
    }

    /// Sum of all genesis allocations.
    pub fn genesis_supply(&self) -> u128 {
        self.genesis.iter().map(|g| g.amount).fold(0u128, u128::saturating_add)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            symbol: default_symbol(),
            decimals: default_decimals(),
            administrator: Address::ZERO,
            accrual_formula: AccrualFormula::default(),
            delegation_default: DelegationDefault::default(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            genesis: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "Example Revenue Token"
symbol = "EXR"
administrator = "0x0909090909090909090909090909090909090909"
accrual_formula = "literal"
delegation_default = "unassigned"
log_format = "json"

[[genesis]]
account = "0x0101010101010101010101010101010101010101"
amount = "1000000000000000000000000"

[[genesis]]
account = "0x0202020202020202020202020202020202020202"
amount = 5000
"#;

    #[test]
    fn parses_full_config() {
        let config = LedgerConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.symbol, "EXR");
        assert_eq!(config.decimals, 18);
        assert_eq!(config.administrator, Address::repeat_byte(9));
        assert_eq!(config.accrual_formula, AccrualFormula::Literal);
        assert_eq!(config.delegation_default, DelegationDefault::Unassigned);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.genesis.len(), 2);
        assert_eq!(config.genesis[0].amount, 1_000_000 * 1_000_000_000_000_000_000);
        assert_eq!(config.genesis[1].amount, 5_000);
        assert_eq!(config.genesis_supply(), 1_000_000 * 1_000_000_000_000_000_000 + 5_000);
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config =
            LedgerConfig::from_toml_str(r#"administrator = "0x0909090909090909090909090909090909090909""#)
                .unwrap();
        assert_eq!(config.accrual_formula, AccrualFormula::Undistributed);
        assert_eq!(config.delegation_default, DelegationDefault::SelfDelegate);
        assert_eq!(config.log_level, "info");
        assert!(config.genesis.is_empty());
    }

    #[test]
    fn toml_roundtrip() {
        let config = LedgerConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(LedgerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_administrator_is_rejected() {
        assert!(matches!(LedgerConfig::from_toml_str(""), Err(TokenError::Config(_))));
    }

    #[test]
    fn malformed_address_is_rejected() {
        let err = LedgerConfig::from_toml_str(r#"administrator = "0x12""#).unwrap_err();
        assert!(matches!(err, TokenError::Config(_)));
    }

    #[test]
    fn genesis_overflow_is_rejected() {
        let mut config = LedgerConfig {
            administrator: Address::repeat_byte(9),
            ..Default::default()
        };
        config.genesis = vec![
            GenesisAllocation { account: Address::repeat_byte(1), amount: u128::MAX },
            GenesisAllocation { account: Address::repeat_byte(2), amount: 1 },
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn logging_installs_once() {
        let config = LedgerConfig::default();
        let _ = config.init_logging();
        assert!(!config.init_logging());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = LedgerConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.name, "Example Revenue Token");
    }
}
