use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LendingError, Result};

/// platform-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// flat fee charged per loan, fixed on the loan at request time
    pub platform_fee: Money,
}

impl PlatformConfig {
    pub fn new(platform_fee: Money) -> Result<Self> {
        if platform_fee.is_negative() {
            return Err(LendingError::InvalidAmount {
                amount: platform_fee,
            });
        }
        Ok(Self { platform_fee })
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            platform_fee: Money::from_decimal(dec!(3.75)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fee() {
        let config = PlatformConfig::default();
        assert_eq!(config.platform_fee, Money::from_decimal(dec!(3.75)));
    }

    #[test]
    fn test_negative_fee_rejected() {
        let result = PlatformConfig::new(Money::from_major(-1));
        assert!(matches!(result, Err(LendingError::InvalidAmount { .. })));
    }
}
