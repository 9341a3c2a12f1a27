//! Transfer requests: tagged NEED / PROVIDE entries authored upstream.

use crate::fixed::Fixed64;
use crate::id::{RequestId, ResourceKind, TargetId};
use serde::{Deserialize, Serialize};

/// Whether the endpoint wants resources delivered or offers them for pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Need,
    Provide,
}

/// A pending resource transfer at one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: RequestId,
    pub target: TargetId,
    pub resource: ResourceKind,
    pub kind: RequestKind,
    /// Always positive and at most `i32::MAX`, the integer range of
    /// `Fixed64`; the direction lives in `kind`.
    pub amount: u32,
    /// Units per tick the needed/available quantity grows (negative: shrinks).
    pub rate_of_change: Fixed64,
    /// Weight applied to every throughput score for this request.
    pub priority_multiplier: Fixed64,
}

impl TransferRequest {
    /// Build a request from a signed amount: positive means the target needs
    /// `amount` delivered, negative means it offers `|amount|` for pickup.
    pub fn new(
        id: impl Into<RequestId>,
        target: impl Into<TargetId>,
        resource: ResourceKind,
        signed_amount: i64,
    ) -> Result<Self, RequestError> {
        if signed_amount == 0 {
            return Err(RequestError::ZeroAmount);
        }
        let kind = if signed_amount > 0 {
            RequestKind::Need
        } else {
            RequestKind::Provide
        };
        let magnitude = signed_amount.unsigned_abs();
        let amount = i32::try_from(magnitude)
            .map(i32::unsigned_abs)
            .map_err(|_| RequestError::AmountOutOfRange(signed_amount))?;

        Ok(Self {
            id: id.into(),
            target: target.into(),
            resource,
            kind,
            amount,
            rate_of_change: Fixed64::ZERO,
            priority_multiplier: Fixed64::ONE,
        })
    }

    pub fn with_rate_of_change(mut self, rate: Fixed64) -> Self {
        self.rate_of_change = rate;
        self
    }

    pub fn with_priority_multiplier(mut self, multiplier: Fixed64) -> Result<Self, RequestError> {
        if multiplier <= Fixed64::ZERO {
            return Err(RequestError::NonPositiveMultiplier(multiplier));
        }
        self.priority_multiplier = multiplier;
        Ok(self)
    }

    /// Signed view of the amount, the inverse of the constructor's convention.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            RequestKind::Need => i64::from(self.amount),
            RequestKind::Provide => -i64::from(self.amount),
        }
    }

    pub fn is_need(&self) -> bool {
        self.kind == RequestKind::Need
    }

    pub fn is_provide(&self) -> bool {
        self.kind == RequestKind::Provide
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RequestError {
    #[error("transfer amount must be non-zero")]
    ZeroAmount,
    #[error("transfer amount out of range: {0}")]
    AmountOutOfRange(i64),
    #[error("priority multiplier must be positive, got {0}")]
    NonPositiveMultiplier(Fixed64),
}
