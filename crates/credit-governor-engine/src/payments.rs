//! Payment event processing.
//!
//! Payment providers deliver events at least once. Each event id is claimed
//! with a set-if-absent marker before any side effect, so a redelivered event
//! finds the marker and is acknowledged without a second award.
//!
//! If the award itself fails, the event is written to a dead-letter record and
//! the error is returned so the provider redelivers. The marker stays set: the
//! redelivery is acknowledged as a duplicate and the dead letter waits for an
//! operator. Whether a failed award is safe to repeat is a judgment call
//! (the failure may be a data problem), so it is never retried automatically.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use credit_governor_core::{
    AccountId, DeadLetterRecord, EventId, PaymentEvent, PaymentEventKind,
};
use credit_governor_store::{CounterStore, Keys};

use crate::error::{GovernorError, Result};
use crate::ledger::CreditLedger;

/// Why an event was acknowledged without an award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The provider event type carries no credits.
    UnhandledType(String),

    /// A confirmed payment without an account or a positive credit amount.
    Malformed,
}

/// What processing an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Credits were awarded.
    Awarded {
        /// Account credited.
        account: AccountId,
        /// Credits awarded.
        amount: i64,
        /// Balance after the award.
        balance: i64,
    },

    /// The event id was seen before; nothing was done.
    Duplicate,

    /// The event was new but carried nothing to award.
    Ignored(IgnoreReason),
}

/// Turns at-least-once payment events into exactly-once awards.
#[derive(Clone)]
pub struct PaymentEventProcessor {
    store: Arc<dyn CounterStore>,
    keys: Keys,
    ledger: CreditLedger,
    processed_ttl: Duration,
    dead_letter_ttl: Duration,
}

impl PaymentEventProcessor {
    /// Create a processor awarding through `ledger`.
    #[must_use]
    pub fn new(
        store: Arc<dyn CounterStore>,
        keys: Keys,
        ledger: CreditLedger,
        processed_ttl: Duration,
        dead_letter_ttl: Duration,
    ) -> Self {
        Self {
            store,
            keys,
            ledger,
            processed_ttl,
            dead_letter_ttl,
        }
    }

    /// Process one delivery of a payment event.
    ///
    /// # Errors
    ///
    /// - `GovernorError::Store` if the event could not be claimed; nothing was
    ///   awarded and redelivery is safe.
    /// - `GovernorError::AwardFailed` if the award failed; a dead-letter record
    ///   was written (best effort) and redelivery will be acknowledged as a
    ///   duplicate.
    pub async fn process(&self, event: &PaymentEvent) -> Result<ProcessOutcome> {
        let claimed = self
            .store
            .set_if_absent(
                &self.keys.processed_event(&event.id),
                "1",
                Some(self.processed_ttl),
            )
            .await?;

        if !claimed {
            tracing::warn!(event_id = %event.id, "Duplicate payment event delivery");
            return Ok(ProcessOutcome::Duplicate);
        }

        if let PaymentEventKind::Other(kind) = &event.kind {
            tracing::debug!(event_id = %event.id, kind = %kind, "Unhandled payment event type");
            return Ok(ProcessOutcome::Ignored(IgnoreReason::UnhandledType(
                kind.clone(),
            )));
        }

        let Some((account, amount)) = event.award_target() else {
            tracing::warn!(
                event_id = %event.id,
                account = ?event.account,
                credits = ?event.credits,
                "Malformed payment event: missing account or credits"
            );
            return Ok(ProcessOutcome::Ignored(IgnoreReason::Malformed));
        };

        match self.ledger.award(account, amount).await {
            Ok(balance) => {
                tracing::info!(
                    event_id = %event.id,
                    account = %account,
                    amount,
                    balance,
                    "Payment credits awarded"
                );
                Ok(ProcessOutcome::Awarded {
                    account: account.clone(),
                    amount,
                    balance,
                })
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(
                    event_id = %event.id,
                    account = %account,
                    amount,
                    error = %message,
                    "Payment award failed"
                );
                self.write_dead_letter(event, account, amount, &message)
                    .await;
                Err(GovernorError::AwardFailed {
                    event_id: event.id.clone(),
                    message,
                })
            }
        }
    }

    async fn write_dead_letter(
        &self,
        event: &PaymentEvent,
        account: &AccountId,
        amount: i64,
        message: &str,
    ) {
        let record = DeadLetterRecord {
            event_id: event.id.clone(),
            account: account.clone(),
            amount,
            error: message.to_string(),
            payload: event.payload.clone(),
            failed_at: Utc::now(),
        };

        let written = match serde_json::to_string(&record) {
            Ok(json) => self
                .store
                .set(
                    &self.keys.dead_letter(&event.id),
                    &json,
                    Some(self.dead_letter_ttl),
                )
                .await
                .map_err(GovernorError::from),
            Err(err) => Err(err.into()),
        };

        match written {
            Ok(()) => tracing::info!(event_id = %event.id, "Dead-letter record written"),
            Err(err) => tracing::error!(
                event_id = %event.id,
                account = %account,
                amount,
                error = %err,
                "Failed to write dead-letter record"
            ),
        }
    }

    /// Read the dead-letter record of an event, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the record is corrupt.
    pub async fn dead_letter(&self, event_id: &EventId) -> Result<Option<DeadLetterRecord>> {
        let Some(json) = self.store.get_raw(&self.keys.dead_letter(event_id)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Operator action: award the credits of a dead-lettered event and clear
    /// the record. Returns the new balance, or `None` if there is no record or
    /// the record has already been claimed by another resolution.
    ///
    /// The record is claimed with a set-if-absent marker before the award, so
    /// concurrent or repeated resolutions award once. If the award fails the
    /// claim is released and the record kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the award fails.
    pub async fn resolve_dead_letter(&self, event_id: &EventId) -> Result<Option<i64>> {
        let Some(record) = self.dead_letter(event_id).await? else {
            return Ok(None);
        };

        let claim = self.keys.dead_letter_resolved(event_id);
        if !self
            .store
            .set_if_absent(&claim, "1", Some(self.dead_letter_ttl))
            .await?
        {
            tracing::warn!(event_id = %event_id, "Dead letter already being resolved");
            return Ok(None);
        }

        let balance = match self.ledger.award(&record.account, record.amount).await {
            Ok(balance) => balance,
            Err(err) => {
                if let Err(release) = self.store.delete(&claim).await {
                    tracing::error!(
                        event_id = %event_id,
                        error = %release,
                        "Failed to release dead-letter claim"
                    );
                }
                return Err(err);
            }
        };

        // The claim stays set, so a failed delete cannot lead to a second award.
        if let Err(err) = self.store.delete(&self.keys.dead_letter(event_id)).await {
            tracing::error!(
                event_id = %event_id,
                error = %err,
                "Failed to delete resolved dead-letter record"
            );
        }

        tracing::info!(
            event_id = %event_id,
            account = %record.account,
            amount = record.amount,
            balance,
            "Dead-letter record resolved"
        );

        Ok(Some(balance))
    }
}
