use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::decimal::Rate;
use crate::errors::{PaymentError, Result};
use crate::payments::ProcessorFeePolicy;

pub const ENV_WEBHOOK_SECRET: &str = "CAPITALFLOW_WEBHOOK_SECRET";
pub const ENV_PROCESSOR_FEE_PERCENT: &str = "CAPITALFLOW_PROCESSOR_FEE_PERCENT";
pub const ENV_CHARGE_PROCESSOR_FEE: &str = "CAPITALFLOW_CHARGE_PROCESSOR_FEE";

/// payment core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// shared secret for provider webhook signatures
    pub webhook_secret: Option<String>,
    pub processor_fee: ProcessorFeePolicy,
    /// book the processor fee after automated payments
    pub charge_processor_fee: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            processor_fee: ProcessorFeePolicy::default(),
            charge_processor_fee: true,
        }
    }
}

impl CoreConfig {
    /// parse from JSON; missing fields take defaults
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: CoreConfig = serde_json::from_str(raw).map_err(|e| {
            PaymentError::InvalidConfiguration {
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// load from `CAPITALFLOW_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CoreConfig::default();

        config.webhook_secret = lookup(ENV_WEBHOOK_SECRET).filter(|s| !s.is_empty());

        if let Some(raw) = lookup(ENV_PROCESSOR_FEE_PERCENT) {
            let percent = Decimal::from_str(raw.trim()).map_err(|_| {
                PaymentError::InvalidConfiguration {
                    message: format!("invalid {}: {}", ENV_PROCESSOR_FEE_PERCENT, raw),
                }
            })?;
            config.processor_fee = ProcessorFeePolicy::new(Rate::from_percentage(percent));
        }

        if let Some(raw) = lookup(ENV_CHARGE_PROCESSOR_FEE) {
            config.charge_processor_fee = raw.trim().parse().map_err(|_| {
                PaymentError::InvalidConfiguration {
                    message: format!("invalid {}: {}", ENV_CHARGE_PROCESSOR_FEE, raw),
                }
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.processor_fee.rate.as_percentage();
        if rate < Decimal::ZERO || rate > Decimal::from(100) {
            return Err(PaymentError::InvalidConfiguration {
                message: format!("processor fee {} must be between 0% and 100%", self.processor_fee.rate),
            });
        }
        Ok(())
    }

    /// secret needed to verify webhooks
    pub fn require_webhook_secret(&self) -> Result<&str> {
        self.webhook_secret
            .as_deref()
            .ok_or_else(|| PaymentError::InvalidConfiguration {
                message: format!("{} is not set", ENV_WEBHOOK_SECRET),
            })
    }
}
