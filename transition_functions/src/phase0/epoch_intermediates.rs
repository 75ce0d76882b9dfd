use core::num::NonZeroU64;

use anyhow::{ensure, Result};
use arithmetic::{NonZeroU64Ext as _, U64Ext as _};
use enumset::{EnumSet, EnumSetType};
use helper_functions::{
    accessors::{
        churn_limit, get_block_root, get_block_root_at_slot, get_current_epoch,
        get_finality_delay, get_previous_epoch,
    },
    error::Error as HelperError,
    misc::compute_activation_exit_epoch,
    predicates::{
        is_eligible_for_activation_queue, is_eligible_for_penalties, is_in_inactivity_leak,
    },
};
use itertools::{Either, Itertools as _};
use tracing::debug;
use types::{
    config::Config,
    nonstandard::AttestationEpoch,
    phase0::{
        consts::{BASE_REWARDS_PER_EPOCH, FAR_FUTURE_EPOCH},
        containers::{PendingAttestation, Validator},
        primitives::{Epoch, Gwei, ValidatorIndex},
    },
    traits::{BeaconState, CommitteeResolver},
};

use crate::{unphased::Error, Cancellation};

// Both must be powers of 2.
const VALIDATORS_PER_CANCELLATION_CHECK: u64 = 1 << 10;
const ATTESTATIONS_PER_CANCELLATION_CHECK: usize = 1 << 5;

/// The parts of a [`Validator`] that epoch processing reads.
///
/// Taken once per transition. Registry updates made later in the same transition are not
/// reflected here.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ValidatorSnapshot {
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl From<Validator> for ValidatorSnapshot {
    fn from(validator: Validator) -> Self {
        let Validator {
            effective_balance,
            slashed,
            activation_eligibility_epoch,
            activation_epoch,
            exit_epoch,
            withdrawable_epoch,
            ..
        } = validator;

        Self {
            effective_balance,
            slashed,
            activation_eligibility_epoch,
            activation_epoch,
            exit_epoch,
            withdrawable_epoch,
        }
    }
}

impl ValidatorSnapshot {
    #[inline]
    #[must_use]
    pub const fn is_active(self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }
}

#[derive(EnumSetType, Debug)]
pub enum AttesterFlag {
    Unslashed,
    Eligible,
    PreviousSource,
    PreviousTarget,
    PreviousHead,
    CurrentSource,
    CurrentTarget,
    CurrentHead,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Inclusion {
    pub delay: NonZeroU64,
    pub proposer_index: ValidatorIndex,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AttesterStatus {
    pub validator: ValidatorSnapshot,
    pub flags: EnumSet<AttesterFlag>,
    pub active: bool,
    /// The fastest inclusion of any previous epoch attestation this validator participated in.
    pub inclusion: Option<Inclusion>,
}

impl AttesterStatus {
    #[inline]
    #[must_use]
    pub fn has(self, flags: impl Into<EnumSet<AttesterFlag>>) -> bool {
        self.flags.is_superset(flags.into())
    }
}

/// Effective balance of unslashed validators with matching votes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EpochStakeSummary {
    pub source_stake: NonZeroU64,
    pub target_stake: NonZeroU64,
    pub head_stake: NonZeroU64,
}

/// Everything later stages of epoch processing need, computed in one pass over the state.
///
/// Stake totals are at least `EFFECTIVE_BALANCE_INCREMENT`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EpochProcess {
    pub previous_epoch: Epoch,
    pub current_epoch: Epoch,
    pub statuses: Vec<AttesterStatus>,
    pub total_active_stake: NonZeroU64,
    pub previous_epoch_unslashed_stake: EpochStakeSummary,
    pub current_epoch_unslashed_target_stake: NonZeroU64,
    pub active_validators: u64,
    pub indices_to_slash: Vec<ValidatorIndex>,
    pub indices_to_set_activation_eligibility: Vec<ValidatorIndex>,
    /// Ordered by activation eligibility epoch and then by index. Not limited by churn.
    pub indices_to_maybe_activate: Vec<ValidatorIndex>,
    pub indices_to_eject: Vec<ValidatorIndex>,
    pub exit_queue_end: Epoch,
    pub exit_queue_end_churn: u64,
    pub churn_limit: u64,
}

impl EpochProcess {
    pub fn status(&self, validator_index: ValidatorIndex) -> Result<AttesterStatus> {
        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.statuses.get(index))
            .copied()
            .ok_or_else(|| {
                Error::ValidatorNotInRegistry {
                    validator_index,
                    validator_count: self.statuses.len() as u64,
                }
                .into()
            })
    }
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ComponentDeltas {
    pub rewards: Vec<Gwei>,
    pub penalties: Vec<Gwei>,
}

impl ComponentDeltas {
    fn new(validator_count: usize) -> Self {
        Self {
            rewards: vec![0; validator_count],
            penalties: vec![0; validator_count],
        }
    }

    fn reward(&mut self, validator_index: ValidatorIndex, amount: Gwei) -> Result<()> {
        add_delta(&mut self.rewards, validator_index, amount)
    }

    fn penalize(&mut self, validator_index: ValidatorIndex, amount: Gwei) -> Result<()> {
        add_delta(&mut self.penalties, validator_index, amount)
    }
}

/// Rewards and penalties for the previous epoch, indexed by validator index.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Deltas {
    pub source: ComponentDeltas,
    pub target: ComponentDeltas,
    pub head: ComponentDeltas,
    pub inclusion_delay: ComponentDeltas,
    pub inactivity: ComponentDeltas,
}

impl Deltas {
    fn new(validator_count: usize) -> Self {
        Self {
            source: ComponentDeltas::new(validator_count),
            target: ComponentDeltas::new(validator_count),
            head: ComponentDeltas::new(validator_count),
            inclusion_delay: ComponentDeltas::new(validator_count),
            inactivity: ComponentDeltas::new(validator_count),
        }
    }

    fn components(&self) -> [&ComponentDeltas; 5] {
        [
            &self.source,
            &self.target,
            &self.head,
            &self.inclusion_delay,
            &self.inactivity,
        ]
    }

    /// Sums of rewards and penalties across all components for each validator.
    pub fn combined(&self) -> Result<Vec<(Gwei, Gwei)>> {
        let validator_count = self.source.rewards.len();

        (0..validator_count)
            .map(|index| {
                self.components().into_iter().try_fold(
                    (0, 0),
                    |(reward, penalty): (Gwei, Gwei), component| {
                        let reward = component
                            .rewards
                            .get(index)
                            .and_then(|delta| reward.checked_add(*delta));

                        let penalty = component
                            .penalties
                            .get(index)
                            .and_then(|delta| penalty.checked_add(*delta));

                        reward.zip(penalty).ok_or(HelperError::GweiOverflow)
                    },
                )
            })
            .map(|result| result.map_err(Into::into))
            .collect()
    }
}

fn add_delta(deltas: &mut [Gwei], validator_index: ValidatorIndex, amount: Gwei) -> Result<()> {
    let validator_count = deltas.len() as u64;

    let delta = usize::try_from(validator_index)
        .ok()
        .and_then(|index| deltas.get_mut(index))
        .ok_or(Error::ValidatorNotInRegistry {
            validator_index,
            validator_count,
        })?;

    *delta = delta.checked_add(amount).ok_or(HelperError::GweiOverflow)?;

    Ok(())
}

/// Scans the registry and pending attestations once and derives everything epoch processing needs.
///
/// Fails with [`Error::Cancelled`] if `cancellation` is raised while scanning.
/// The partial result is discarded in that case.
pub fn statistics(
    config: &Config,
    state: &impl BeaconState,
    committees: &impl CommitteeResolver,
    cancellation: &Cancellation,
) -> Result<EpochProcess> {
    let previous_epoch = get_previous_epoch(config, state);
    let current_epoch = get_current_epoch(config, state);

    let slashings_epoch = current_epoch
        .checked_add(config.slashings_offset())
        .ok_or(HelperError::EpochOverflow)?;

    let mut statuses = Vec::with_capacity(usize::try_from(state.validator_count())?);
    let mut total_active_stake: Gwei = 0;
    let mut active_validators = 0;
    let mut indices_to_slash = vec![];
    let mut indices_to_set_activation_eligibility = vec![];
    let mut activation_candidates = vec![];
    let mut indices_to_eject = vec![];

    for (validator_index, validator) in (0..).zip(state.validators()) {
        if validator_index & (VALIDATORS_PER_CANCELLATION_CHECK - 1) == 0 {
            cancellation.check()?;
        }

        let validator = validator?;
        let snapshot = ValidatorSnapshot::from(validator);
        let mut flags = EnumSet::empty();

        if snapshot.slashed {
            if snapshot.withdrawable_epoch == slashings_epoch {
                indices_to_slash.push(validator_index);
            }
        } else {
            flags |= AttesterFlag::Unslashed;
        }

        if is_eligible_for_penalties(&validator, previous_epoch) {
            flags |= AttesterFlag::Eligible;
        }

        let active = snapshot.is_active(current_epoch);

        if active {
            active_validators += 1;

            total_active_stake = total_active_stake
                .checked_add(snapshot.effective_balance)
                .ok_or(HelperError::GweiOverflow)?;
        }

        if is_eligible_for_activation_queue(config, &validator) {
            indices_to_set_activation_eligibility.push(validator_index);
        }

        if snapshot.activation_epoch == FAR_FUTURE_EPOCH
            && snapshot.activation_eligibility_epoch <= current_epoch
        {
            activation_candidates.push((snapshot.activation_eligibility_epoch, validator_index));
        }

        if active
            && snapshot.effective_balance <= config.ejection_balance
            && snapshot.exit_epoch == FAR_FUTURE_EPOCH
        {
            indices_to_eject.push(validator_index);
        }

        statuses.push(AttesterStatus {
            validator: snapshot,
            flags,
            active,
            inclusion: None,
        });
    }

    // > Order by the sequence of activation_eligibility_epoch setting and then index
    let indices_to_maybe_activate = activation_candidates
        .into_iter()
        .sorted_unstable()
        .map(|(_, validator_index)| validator_index)
        .collect_vec();

    let churn_limit = churn_limit(config, active_validators);
    let mut exit_queue_end = compute_activation_exit_epoch(config, current_epoch)?;

    let mut exit_queue_end_churn: u64 = statuses
        .iter()
        .filter(|status| status.validator.exit_epoch == exit_queue_end)
        .count()
        .try_into()?;

    if exit_queue_end_churn >= churn_limit {
        exit_queue_end = exit_queue_end
            .checked_add(1)
            .ok_or(HelperError::EpochOverflow)?;

        exit_queue_end_churn = 0;
    }

    for attestation_epoch in [AttestationEpoch::Previous, AttestationEpoch::Current] {
        process_attestations(
            config,
            state,
            committees,
            cancellation,
            &mut statuses,
            attestation_epoch,
        )?;
    }

    let increment = config.effective_balance_increment;
    let (previous_epoch_unslashed_stake, current_epoch_unslashed_target_stake) =
        unslashed_stake(config, &statuses)?;

    let epoch_process = EpochProcess {
        previous_epoch,
        current_epoch,
        statuses,
        total_active_stake: total_active_stake.at_least(increment),
        previous_epoch_unslashed_stake,
        current_epoch_unslashed_target_stake,
        active_validators,
        indices_to_slash,
        indices_to_set_activation_eligibility,
        indices_to_maybe_activate,
        indices_to_eject,
        exit_queue_end,
        exit_queue_end_churn,
        churn_limit,
    };

    debug!(
        current_epoch,
        active_validators,
        total_active_stake = epoch_process.total_active_stake,
        to_slash = epoch_process.indices_to_slash.len(),
        to_set_activation_eligibility = epoch_process.indices_to_set_activation_eligibility.len(),
        to_maybe_activate = epoch_process.indices_to_maybe_activate.len(),
        to_eject = epoch_process.indices_to_eject.len(),
        churn_limit,
        "collected epoch statistics",
    );

    Ok(epoch_process)
}

fn process_attestations(
    config: &Config,
    state: &impl BeaconState,
    committees: &impl CommitteeResolver,
    cancellation: &Cancellation,
    statuses: &mut [AttesterStatus],
    attestation_epoch: AttestationEpoch,
) -> Result<()> {
    let (source_flag, target_flag, head_flag) = match attestation_epoch {
        AttestationEpoch::Previous => (
            AttesterFlag::PreviousSource,
            AttesterFlag::PreviousTarget,
            AttesterFlag::PreviousHead,
        ),
        AttestationEpoch::Current => (
            AttesterFlag::CurrentSource,
            AttesterFlag::CurrentTarget,
            AttesterFlag::CurrentHead,
        ),
    };

    let attestations = match attestation_epoch {
        AttestationEpoch::Previous => Either::Left(state.previous_epoch_attestations()),
        AttestationEpoch::Current => Either::Right(state.current_epoch_attestations()),
    };

    let boundary_root = get_block_root(config, state, attestation_epoch)?;
    let validator_count = statuses.len() as u64;

    for (position, attestation) in attestations.enumerate() {
        if position & (ATTESTATIONS_PER_CANCELLATION_CHECK - 1) == 0 {
            cancellation.check()?;
        }

        let PendingAttestation {
            aggregation_bits,
            data,
            inclusion_delay,
            proposer_index,
        } = attestation?;

        let head_root = get_block_root_at_slot(config, state, data.slot)?;
        let committee = committees.beacon_committee(data.slot, data.index)?;

        ensure!(
            aggregation_bits.len() == committee.len(),
            HelperError::CommitteeLengthMismatch {
                aggregation_bitlist_length: aggregation_bits.len(),
                committee_length: committee.len(),
            },
        );

        let inclusion = match attestation_epoch {
            AttestationEpoch::Previous => {
                let delay = NonZeroU64::new(inclusion_delay)
                    .ok_or(Error::InclusionDelayZero { slot: data.slot })?;

                Some(Inclusion {
                    delay,
                    proposer_index,
                })
            }
            AttestationEpoch::Current => None,
        };

        let participants = committee
            .iter()
            .zip(aggregation_bits.iter().by_vals())
            .filter(|(_, participated)| *participated)
            .map(|(validator_index, _)| *validator_index);

        for validator_index in participants {
            let status = usize::try_from(validator_index)
                .ok()
                .and_then(|index| statuses.get_mut(index))
                .ok_or(Error::ValidatorNotInRegistry {
                    validator_index,
                    validator_count,
                })?;

            if let Some(inclusion) = inclusion {
                if status
                    .inclusion
                    .is_none_or(|fastest| inclusion.delay < fastest.delay)
                {
                    status.inclusion = Some(inclusion);
                }
            }

            status.flags |= source_flag;

            // A head vote only counts if the target vote does.
            if data.target.root == boundary_root {
                status.flags |= target_flag;

                if data.beacon_block_root == head_root {
                    status.flags |= head_flag;
                }
            }
        }
    }

    Ok(())
}

fn unslashed_stake(
    config: &Config,
    statuses: &[AttesterStatus],
) -> Result<(EpochStakeSummary, NonZeroU64)> {
    let mut source_stake: Gwei = 0;
    let mut target_stake: Gwei = 0;
    let mut head_stake: Gwei = 0;
    let mut current_target_stake: Gwei = 0;

    let add = |total: Gwei, status: &AttesterStatus| {
        total
            .checked_add(status.validator.effective_balance)
            .ok_or(HelperError::GweiOverflow)
    };

    for status in statuses {
        if status.has(AttesterFlag::PreviousSource | AttesterFlag::Unslashed) {
            source_stake = add(source_stake, status)?;

            if status.has(AttesterFlag::PreviousTarget) {
                target_stake = add(target_stake, status)?;

                if status.has(AttesterFlag::PreviousHead) {
                    head_stake = add(head_stake, status)?;
                }
            }
        }

        if status.has(AttesterFlag::CurrentTarget | AttesterFlag::Unslashed) {
            current_target_stake = add(current_target_stake, status)?;
        }
    }

    let increment = config.effective_balance_increment;

    let summary = EpochStakeSummary {
        source_stake: source_stake.at_least(increment),
        target_stake: target_stake.at_least(increment),
        head_stake: head_stake.at_least(increment),
    };

    Ok((summary, current_target_stake.at_least(increment)))
}

/// Computes rewards and penalties for attestations made in the previous epoch.
///
/// Applying them to balances is left to the caller.
pub fn epoch_deltas(
    config: &Config,
    state: &impl BeaconState,
    epoch_process: &EpochProcess,
) -> Result<Deltas> {
    let finality_delay = get_finality_delay(config, state);
    let in_inactivity_leak = is_in_inactivity_leak(config, state);
    let increment = config.effective_balance_increment;
    let total_active_stake = epoch_process.total_active_stake;
    let total_active_stake_sqrt = total_active_stake.integer_sqrt();

    // > Factored out from balance totals to avoid uint64 overflow
    let total_active_increments = (total_active_stake.get() / increment).at_least(NonZeroU64::MIN);

    let EpochStakeSummary {
        source_stake,
        target_stake,
        head_stake,
    } = epoch_process.previous_epoch_unslashed_stake;

    let mut deltas = Deltas::new(epoch_process.statuses.len());

    for (validator_index, status) in (0..).zip(&epoch_process.statuses) {
        let effective_balance = status.validator.effective_balance;

        let base_reward = effective_balance
            .checked_mul(config.base_reward_factor)
            .ok_or(HelperError::GweiOverflow)?
            / total_active_stake_sqrt
            / BASE_REWARDS_PER_EPOCH;

        let proposer_reward = base_reward / config.proposer_reward_quotient;

        let attestation_component_reward = |attesting_stake: NonZeroU64| {
            if in_inactivity_leak {
                // > Since full base reward will be canceled out by inactivity penalty deltas,
                // > optimal participation receives full base reward compensation here.
                Ok(base_reward)
            } else {
                base_reward
                    .checked_mul_div(attesting_stake.get() / increment, total_active_increments)
                    .ok_or(HelperError::GweiOverflow)
            }
        };

        if status.has(AttesterFlag::Eligible) {
            let components = [
                (
                    &mut deltas.source,
                    AttesterFlag::PreviousSource,
                    source_stake,
                ),
                (
                    &mut deltas.target,
                    AttesterFlag::PreviousTarget,
                    target_stake,
                ),
                (&mut deltas.head, AttesterFlag::PreviousHead, head_stake),
            ];

            for (component, flag, attesting_stake) in components {
                if status.has(flag | AttesterFlag::Unslashed) {
                    let reward = attestation_component_reward(attesting_stake)?;
                    component.reward(validator_index, reward)?;
                } else {
                    component.penalize(validator_index, base_reward)?;
                }
            }

            if in_inactivity_leak {
                // > If validator is performing optimally this cancels all rewards for a neutral
                // > balance
                let canceling_penalty = base_reward
                    .checked_mul(BASE_REWARDS_PER_EPOCH.get())
                    .ok_or(HelperError::GweiOverflow)?
                    - proposer_reward;

                deltas.inactivity.penalize(validator_index, canceling_penalty)?;

                if !status.has(AttesterFlag::PreviousTarget | AttesterFlag::Unslashed) {
                    let inactivity_penalty = effective_balance
                        .checked_mul_div(finality_delay, config.inactivity_penalty_quotient)
                        .ok_or(HelperError::GweiOverflow)?;

                    deltas.inactivity.penalize(validator_index, inactivity_penalty)?;
                }

                // > No rewards associated with inactivity penalties
            }
        }

        if !status.has(AttesterFlag::PreviousSource | AttesterFlag::Unslashed) {
            continue;
        }

        if let Some(Inclusion {
            delay,
            proposer_index,
        }) = status.inclusion
        {
            let max_attester_reward = base_reward - proposer_reward;

            deltas.inclusion_delay.reward(proposer_index, proposer_reward)?;
            deltas.inclusion_delay.reward(validator_index, max_attester_reward / delay)?;

            // > No penalties associated with inclusion delay
        }
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use types::phase0::{
        containers::Checkpoint,
        primitives::{CommitteeIndex, Slot},
    };

    use crate::{
        test_utils::{self, StaticCommittees, Vote, MAX_EFFECTIVE_BALANCE},
        ErrorKind,
    };

    use super::*;

    const INCREMENT: Gwei = 1_000_000_000;

    // Values for 4 validators with maximum effective balance.
    const BASE_REWARD: Gwei = 1_431_087;
    const PROPOSER_REWARD: Gwei = 178_885;

    fn four_validators_with_previous_votes(
        votes: impl IntoIterator<Item = Vote>,
    ) -> (types::phase0::beacon_state::BeaconState, StaticCommittees) {
        let mut state = test_utils::state(vec![test_utils::active_validator(); 4]);

        state.previous_epoch_attestations = votes
            .into_iter()
            .map(Vote::into_pending_attestation)
            .collect();

        let committees = StaticCommittees::default().with(8, 0, 0..4);

        (state, committees)
    }

    fn collect(
        state: &impl BeaconState,
        committees: &impl CommitteeResolver,
    ) -> Result<EpochProcess> {
        statistics(&Config::minimal(), state, committees, &Cancellation::never())
    }

    #[test]
    fn stake_totals_are_at_least_one_increment() -> Result<()> {
        let pending_validator = Validator {
            activation_epoch: FAR_FUTURE_EPOCH,
            ..test_utils::active_validator()
        };

        let state = test_utils::state(vec![pending_validator; 3]);
        let epoch_process = collect(&state, &StaticCommittees::default())?;

        let EpochStakeSummary {
            source_stake,
            target_stake,
            head_stake,
        } = epoch_process.previous_epoch_unslashed_stake;

        assert_eq!(epoch_process.active_validators, 0);
        assert_eq!(epoch_process.total_active_stake.get(), INCREMENT);
        assert_eq!(source_stake.get(), INCREMENT);
        assert_eq!(target_stake.get(), INCREMENT);
        assert_eq!(head_stake.get(), INCREMENT);
        assert_eq!(epoch_process.current_epoch_unslashed_target_stake.get(), INCREMENT);

        Ok(())
    }

    #[test]
    fn participants_get_flags_from_aggregation_bits() -> Result<()> {
        let (state, committees) = four_validators_with_previous_votes([Vote::matching(
            8,
            &[true, true, false, true],
        )]);

        let epoch_process = collect(&state, &committees)?;

        let matching = AttesterFlag::PreviousSource
            | AttesterFlag::PreviousTarget
            | AttesterFlag::PreviousHead;

        for validator_index in [0, 1, 3] {
            assert!(epoch_process.status(validator_index)?.has(matching));
        }

        assert!(epoch_process.status(2)?.flags.is_disjoint(matching));

        assert_eq!(
            epoch_process.previous_epoch_unslashed_stake.source_stake.get(),
            3 * MAX_EFFECTIVE_BALANCE,
        );

        Ok(())
    }

    #[test]
    fn head_vote_without_target_vote_is_not_counted() -> Result<()> {
        let vote = Vote {
            target_root: test_utils::block_root(9),
            ..Vote::matching(8, &[true, false, false, false])
        };

        let (state, committees) = four_validators_with_previous_votes([vote]);
        let status = collect(&state, &committees)?.status(0)?;

        assert!(status.has(AttesterFlag::PreviousSource));
        assert!(!status.has(AttesterFlag::PreviousTarget));
        assert!(!status.has(AttesterFlag::PreviousHead));

        Ok(())
    }

    #[test]
    fn fastest_inclusion_wins_and_ties_keep_the_first() -> Result<()> {
        let vote = |inclusion_delay, proposer_index| Vote {
            inclusion_delay,
            proposer_index,
            ..Vote::matching(8, &[true, false, false, false])
        };

        let (state, committees) =
            four_validators_with_previous_votes([vote(3, 1), vote(2, 2), vote(2, 3)]);

        let inclusion = collect(&state, &committees)?.status(0)?.inclusion;

        assert_eq!(
            inclusion,
            Some(Inclusion {
                delay: NonZeroU64::new(2).expect("2 is nonzero"),
                proposer_index: 2,
            }),
        );

        Ok(())
    }

    #[test]
    fn slashed_validators_are_queued_and_excluded_from_stake() -> Result<()> {
        let slashed = Validator {
            slashed: true,
            // Current epoch 2 plus half of the minimal slashings vector.
            withdrawable_epoch: 34,
            ..test_utils::active_validator()
        };

        let mut state = test_utils::state([
            test_utils::active_validator(),
            slashed,
            Validator {
                withdrawable_epoch: 35,
                ..slashed
            },
        ]);

        state.previous_epoch_attestations =
            vec![Vote::matching(8, &[true, true, true]).into_pending_attestation()];

        let committees = StaticCommittees::default().with(8, 0, 0..3);
        let epoch_process = collect(&state, &committees)?;

        assert_eq!(epoch_process.indices_to_slash, [1]);
        assert!(epoch_process.status(0)?.has(AttesterFlag::Unslashed));
        assert!(!epoch_process.status(1)?.has(AttesterFlag::Unslashed));
        assert!(epoch_process.status(1)?.has(AttesterFlag::Eligible));
        assert_eq!(
            epoch_process.previous_epoch_unslashed_stake.source_stake.get(),
            MAX_EFFECTIVE_BALANCE,
        );

        Ok(())
    }

    #[test]
    fn maybe_activate_queue_is_ordered_by_eligibility_then_index() -> Result<()> {
        let candidate = |activation_eligibility_epoch| Validator {
            activation_eligibility_epoch,
            activation_epoch: FAR_FUTURE_EPOCH,
            ..test_utils::active_validator()
        };

        let state = test_utils::state([
            candidate(2),
            candidate(1),
            test_utils::active_validator(),
            candidate(1),
            candidate(0),
            // Not eligible yet in epoch 2.
            candidate(3),
        ]);

        let epoch_process = collect(&state, &StaticCommittees::default())?;

        assert_eq!(epoch_process.indices_to_maybe_activate, [4, 1, 3, 0]);

        Ok(())
    }

    #[test]
    fn registry_queues_are_collected() -> Result<()> {
        let state = test_utils::state([
            Validator {
                effective_balance: 16_000_000_000,
                ..test_utils::active_validator()
            },
            Validator {
                effective_balance: 16_000_000_000,
                exit_epoch: 10,
                ..test_utils::active_validator()
            },
            Validator {
                activation_eligibility_epoch: FAR_FUTURE_EPOCH,
                activation_epoch: FAR_FUTURE_EPOCH,
                ..test_utils::active_validator()
            },
            Validator {
                effective_balance: 31_000_000_000,
                activation_eligibility_epoch: FAR_FUTURE_EPOCH,
                activation_epoch: FAR_FUTURE_EPOCH,
                ..test_utils::active_validator()
            },
        ]);

        let epoch_process = collect(&state, &StaticCommittees::default())?;

        assert_eq!(epoch_process.indices_to_eject, [0]);
        assert_eq!(epoch_process.indices_to_set_activation_eligibility, [2]);
        assert!(epoch_process.indices_to_maybe_activate.is_empty());

        Ok(())
    }

    #[test]
    fn exit_queue_moves_past_a_full_epoch() -> Result<()> {
        // `compute_activation_exit_epoch(2)` is 7 in the minimal configuration.
        let exiting = Validator {
            exit_epoch: 7,
            ..test_utils::active_validator()
        };

        let state = test_utils::state([exiting, exiting, test_utils::active_validator()]);
        let epoch_process = collect(&state, &StaticCommittees::default())?;

        assert_eq!(epoch_process.churn_limit, 2);
        assert_eq!(epoch_process.exit_queue_end, 8);
        assert_eq!(epoch_process.exit_queue_end_churn, 0);

        Ok(())
    }

    #[test]
    fn exit_queue_keeps_epoch_with_room() -> Result<()> {
        let exiting = Validator {
            exit_epoch: 7,
            ..test_utils::active_validator()
        };

        let state = test_utils::state([exiting, test_utils::active_validator()]);
        let epoch_process = collect(&state, &StaticCommittees::default())?;

        assert_eq!(epoch_process.exit_queue_end, 7);
        assert_eq!(epoch_process.exit_queue_end_churn, 1);

        Ok(())
    }

    #[test]
    fn mismatched_aggregation_bits_are_rejected() {
        let (state, committees) =
            four_validators_with_previous_votes([Vote::matching(8, &[true, true])]);

        let error = collect(&state, &committees).expect_err("committee has 4 members");

        assert!(matches!(
            error.downcast_ref(),
            Some(HelperError::CommitteeLengthMismatch {
                aggregation_bitlist_length: 2,
                committee_length: 4,
            }),
        ));
    }

    #[test]
    fn cancellation_discards_statistics() {
        let cancellation = Cancellation::never();
        cancellation.cancel();

        let state = test_utils::state(vec![test_utils::active_validator(); 4]);

        let error = statistics(
            &Config::minimal(),
            &state,
            &StaticCommittees::default(),
            &cancellation,
        )
        .expect_err("cancellation is checked before the first validator");

        assert!(matches!(error.downcast_ref(), Some(Error::Cancelled)));
    }

    /// Raises `cancellation` as soon as the first committee is looked up.
    struct CancellingCommittees {
        committees: StaticCommittees,
        cancellation: Cancellation,
        lookups: Cell<usize>,
    }

    impl CommitteeResolver for CancellingCommittees {
        fn beacon_committee(
            &self,
            slot: Slot,
            committee_index: CommitteeIndex,
        ) -> Result<&[ValidatorIndex]> {
            self.cancellation.cancel();
            self.lookups.set(self.lookups.get() + 1);
            self.committees.beacon_committee(slot, committee_index)
        }
    }

    #[test]
    fn cancellation_is_checked_between_attestation_batches() {
        let votes = (0..33).map(|_| Vote::matching(8, &[true; 4]));
        let (state, committees) = four_validators_with_previous_votes(votes);
        let cancellation = Cancellation::never();

        let committees = CancellingCommittees {
            committees,
            cancellation: cancellation.clone(),
            lookups: Cell::new(0),
        };

        let error = statistics(&Config::minimal(), &state, &committees, &cancellation)
            .expect_err("cancellation is raised while processing the first attestation");

        assert!(matches!(error.downcast_ref(), Some(Error::Cancelled)));

        // The first batch of 32 attestations is processed before the flag is polled again.
        assert_eq!(committees.lookups.get(), 32);
    }

    #[test]
    fn committee_member_outside_registry_aborts_transition() {
        let (state, _) = four_validators_with_previous_votes([Vote::matching(8, &[true; 4])]);
        let committees = StaticCommittees::default().with(8, 0, [0, 1, 2, 9]);

        let error = collect(&state, &committees).expect_err("validator 9 does not exist");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::ValidatorNotInRegistry {
                validator_index: 9,
                validator_count: 4,
            }),
        ));
        assert_eq!(ErrorKind::of(&error), ErrorKind::InvariantViolation);
        assert!(ErrorKind::of(&error).is_fatal_to_transition());
    }

    #[test]
    fn proposer_outside_registry_aborts_transition() -> Result<()> {
        let vote = Vote {
            proposer_index: 9,
            ..Vote::matching(8, &[true; 4])
        };

        let (state, committees) = four_validators_with_previous_votes([vote]);
        let epoch_process = collect(&state, &committees)?;

        let error = epoch_deltas(&Config::minimal(), &state, &epoch_process)
            .expect_err("proposer 9 does not exist");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::ValidatorNotInRegistry {
                validator_index: 9,
                validator_count: 4,
            }),
        ));
        assert!(ErrorKind::of(&error).is_fatal_to_transition());

        Ok(())
    }

    #[test]
    fn epoch_deltas_reward_matching_votes() -> Result<()> {
        let vote = Vote {
            proposer_index: 2,
            ..Vote::matching(8, &[true, true, false, true])
        };

        let config = Config::minimal();
        let (state, committees) = four_validators_with_previous_votes([vote]);
        let epoch_process = collect(&state, &committees)?;
        let deltas = epoch_deltas(&config, &state, &epoch_process)?;

        // 3 of 4 validators attested.
        let component_reward = BASE_REWARD * 96 / 128;

        for component in [&deltas.source, &deltas.target, &deltas.head] {
            assert_eq!(
                component.rewards,
                [component_reward, component_reward, 0, component_reward],
            );
            assert_eq!(component.penalties, [0, 0, BASE_REWARD, 0]);
        }

        let attester_reward = BASE_REWARD - PROPOSER_REWARD;

        assert_eq!(
            deltas.inclusion_delay.rewards,
            [attester_reward, attester_reward, 3 * PROPOSER_REWARD, attester_reward],
        );
        assert_eq!(deltas.inclusion_delay.penalties, [0; 4]);
        assert_eq!(deltas.inactivity, ComponentDeltas::new(4));

        Ok(())
    }

    #[test]
    fn epoch_deltas_penalize_inactivity_during_leak() -> Result<()> {
        let config = Config::minimal();

        let (mut state, committees) =
            four_validators_with_previous_votes([Vote::matching(48, &[true, true, false, true])]);

        // Epoch 7 with nothing finalized after genesis, so the finality delay is 6.
        state.slot = 63;
        state.finalized_checkpoint = Checkpoint::default();

        let committees = committees.with(48, 0, 0..4);
        let epoch_process = collect(&state, &committees)?;
        let deltas = epoch_deltas(&config, &state, &epoch_process)?;

        let canceling_penalty = 4 * BASE_REWARD - PROPOSER_REWARD;
        let inactivity_penalty = MAX_EFFECTIVE_BALANCE * 6 / (1 << 25);

        assert_eq!(deltas.source.rewards, [BASE_REWARD, BASE_REWARD, 0, BASE_REWARD]);
        assert_eq!(
            deltas.inactivity.penalties,
            [
                canceling_penalty,
                canceling_penalty,
                canceling_penalty + inactivity_penalty,
                canceling_penalty,
            ],
        );

        Ok(())
    }

    #[test]
    fn epoch_deltas_are_deterministic() -> Result<()> {
        let config = Config::minimal();

        let (state, committees) = four_validators_with_previous_votes([
            Vote::matching(8, &[true, false, true, true]),
            Vote {
                inclusion_delay: 4,
                proposer_index: 3,
                ..Vote::matching(8, &[false, true, true, false])
            },
        ]);

        let first = epoch_deltas(&config, &state, &collect(&state, &committees)?)?;
        let second = epoch_deltas(&config, &state, &collect(&state, &committees)?)?;

        assert_eq!(first, second);
        assert_eq!(first.combined()?, second.combined()?);

        Ok(())
    }

    #[test]
    fn ineligible_validators_receive_no_attestation_deltas() -> Result<()> {
        let config = Config::minimal();

        let mut state = test_utils::state([
            test_utils::active_validator(),
            Validator {
                activation_epoch: FAR_FUTURE_EPOCH,
                ..test_utils::active_validator()
            },
        ]);

        state.finalized_checkpoint = Checkpoint::default();

        let epoch_process = collect(&state, &StaticCommittees::default())?;
        let deltas = epoch_deltas(&config, &state, &epoch_process)?;

        assert!(!epoch_process.status(1)?.has(AttesterFlag::Eligible));
        assert_eq!(deltas.combined()?[1], (0, 0));
        assert_ne!(deltas.combined()?[0].1, 0);

        Ok(())
    }
}
