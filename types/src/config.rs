use core::num::NonZeroU64;
use std::borrow::Cow;

use hex_literal::hex;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::phase0::primitives::{Epoch, Gwei, Version, H32};

/// Protocol constants threaded through every state transition function.
///
/// This merges the preset (values fixed at compile time in most clients) with the runtime
/// configuration so that a single immutable value describes a network.
/// Field names match the upper case keys used in standard configuration files.
///
/// Divisors and period lengths are [`NonZeroU64`], which makes division by them infallible.
#[expect(
    clippy::unsafe_derive_deserialize,
    reason = "A false positive triggered by `nonzero!`. \
              `Config` has no invariants that deserialization could break. \
              Cross-field constraints are checked by `Config::validate`."
)]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,

    // Genesis
    pub genesis_fork_version: Version,

    // Time parameters
    #[serde(with = "serde_utils::string_or_native")]
    pub slots_per_epoch: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub slots_per_historical_root: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub max_seed_lookahead: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_epochs_to_inactivity_penalty: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_validator_withdrawability_delay: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub shard_committee_period: u64,

    // State list lengths
    #[serde(with = "serde_utils::string_or_native")]
    pub epochs_per_slashings_vector: NonZeroU64,

    // Committees
    #[serde(with = "serde_utils::string_or_native")]
    pub max_validators_per_committee: NonZeroU64,

    // Gwei values
    #[serde(with = "serde_utils::string_or_native")]
    pub effective_balance_increment: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub ejection_balance: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    pub max_effective_balance: Gwei,

    // Rewards and penalties
    #[serde(with = "serde_utils::string_or_native")]
    pub base_reward_factor: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub inactivity_penalty_quotient: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_slashing_penalty_quotient: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub proportional_slashing_multiplier: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_reward_quotient: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub whistleblower_reward_quotient: NonZeroU64,

    // Validator cycle
    #[serde(with = "serde_utils::string_or_native")]
    pub churn_limit_quotient: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_per_epoch_churn_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Meta
            //
            // Use `default` as the default `config_name` and override it in `Config::mainnet`.
            config_name: Cow::Borrowed("default"),

            // Genesis
            genesis_fork_version: H32(hex!("00000000")),

            // Time parameters
            slots_per_epoch: nonzero!(32_u64),
            slots_per_historical_root: nonzero!(8192_u64),
            max_seed_lookahead: 4,
            min_epochs_to_inactivity_penalty: 4,
            min_validator_withdrawability_delay: 256,
            shard_committee_period: 256,

            // State list lengths
            epochs_per_slashings_vector: nonzero!(8192_u64),

            // Committees
            max_validators_per_committee: nonzero!(2048_u64),

            // Gwei values
            effective_balance_increment: nonzero!(1_000_000_000_u64),
            ejection_balance: 16_000_000_000,
            max_effective_balance: 32_000_000_000,

            // Rewards and penalties
            base_reward_factor: 64,
            inactivity_penalty_quotient: nonzero!(1_u64 << 26),
            min_slashing_penalty_quotient: nonzero!(128_u64),
            proportional_slashing_multiplier: 1,
            proposer_reward_quotient: nonzero!(8_u64),
            whistleblower_reward_quotient: nonzero!(512_u64),

            // Validator cycle
            churn_limit_quotient: nonzero!(65536_u64),
            min_per_epoch_churn_limit: 4,
        }
    }
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("minimal"),

            // Genesis
            genesis_fork_version: H32(hex!("00000001")),

            // Time parameters
            slots_per_epoch: nonzero!(8_u64),
            slots_per_historical_root: nonzero!(64_u64),
            shard_committee_period: 64,

            // State list lengths
            epochs_per_slashings_vector: nonzero!(64_u64),

            // Rewards and penalties
            inactivity_penalty_quotient: nonzero!(1_u64 << 25),
            min_slashing_penalty_quotient: nonzero!(64_u64),
            proportional_slashing_multiplier: 2,

            // Validator cycle
            churn_limit_quotient: nonzero!(32_u64),
            min_per_epoch_churn_limit: 2,

            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.config_name.is_empty() {
            return Err(Error::NameEmpty);
        }

        for character in self.config_name.chars() {
            if !matches!(character, 'a'..='z' | '0'..='9' | '-') {
                return Err(Error::NameContainsIllegalCharacters);
            }
        }

        if self.epochs_per_slashings_vector.get() % 2 != 0 {
            return Err(Error::SlashingsVectorLengthOdd {
                epochs_per_slashings_vector: self.epochs_per_slashings_vector,
            });
        }

        if self.max_effective_balance % self.effective_balance_increment != 0 {
            return Err(Error::MaxEffectiveBalanceNotMultipleOfIncrement {
                max_effective_balance: self.max_effective_balance,
                effective_balance_increment: self.effective_balance_increment,
            });
        }

        if self.ejection_balance > self.max_effective_balance {
            return Err(Error::EjectionBalanceAboveMaximum {
                ejection_balance: self.ejection_balance,
                max_effective_balance: self.max_effective_balance,
            });
        }

        Ok(())
    }

    /// Distance between the current epoch and the withdrawable epoch of validators whose
    /// proportional slashing penalty is due in the current epoch.
    #[inline]
    #[must_use]
    pub const fn slashings_offset(&self) -> Epoch {
        self.epochs_per_slashings_vector.get() / 2
    }
}

#[derive(PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("CONFIG_NAME is empty")]
    NameEmpty,
    #[error("CONFIG_NAME contains characters other than a-z, 0-9, and hyphens")]
    NameContainsIllegalCharacters,
    #[error("EPOCHS_PER_SLASHINGS_VECTOR ({epochs_per_slashings_vector}) is odd")]
    SlashingsVectorLengthOdd {
        epochs_per_slashings_vector: NonZeroU64,
    },
    #[error(
        "MAX_EFFECTIVE_BALANCE ({max_effective_balance}) is not a multiple of \
         EFFECTIVE_BALANCE_INCREMENT ({effective_balance_increment})"
    )]
    MaxEffectiveBalanceNotMultipleOfIncrement {
        max_effective_balance: Gwei,
        effective_balance_increment: NonZeroU64,
    },
    #[error(
        "EJECTION_BALANCE ({ejection_balance}) exceeds MAX_EFFECTIVE_BALANCE ({max_effective_balance})"
    )]
    EjectionBalanceAboveMaximum {
        ejection_balance: Gwei,
        max_effective_balance: Gwei,
    },
}
