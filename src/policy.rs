use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ClaimError, ClaimResult};

/// Payer category a claim is billed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayerCategory {
    Medicare,
    Medicaid,
    Commercial,
    SelfPay,
    WorkersComp,
}

impl PayerCategory {
    pub const ALL: [PayerCategory; 5] = [
        PayerCategory::Medicare,
        PayerCategory::Medicaid,
        PayerCategory::Commercial,
        PayerCategory::SelfPay,
        PayerCategory::WorkersComp,
    ];
}

impl fmt::Display for PayerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PayerCategory::Medicare => "medicare",
            PayerCategory::Medicaid => "medicaid",
            PayerCategory::Commercial => "commercial",
            PayerCategory::SelfPay => "self_pay",
            PayerCategory::WorkersComp => "workers_comp",
        };
        write!(f, "{label}")
    }
}

/// Reimbursement terms for one payer category.
///
/// `contractual_adjustment_rate` is the fraction of gross charges written
/// off per the payer contract; `coinsurance_rate` splits the remaining net
/// charges between the patient and the insurer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayerPolicy {
    pub payer: PayerCategory,
    pub contractual_adjustment_rate: f64,
    pub coinsurance_rate: f64,
}

impl PayerPolicy {
    pub fn new(
        payer: PayerCategory,
        contractual_adjustment_rate: f64,
        coinsurance_rate: f64,
    ) -> ClaimResult<Self> {
        for rate in [contractual_adjustment_rate, coinsurance_rate] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ClaimError::InvalidRate(rate));
            }
        }
        Ok(Self {
            payer,
            contractual_adjustment_rate,
            coinsurance_rate,
        })
    }
}

/// Configuration table mapping payer categories to their policies.
///
/// Updated by an administrator, never by claim processing. Keeping the
/// split data-driven means a new payer is a table entry, not a code change.
#[derive(Debug, Clone, Default)]
pub struct PayerPolicyTable {
    policies: HashMap<PayerCategory, PayerPolicy>,
}

impl PayerPolicyTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Default policy set covering every payer category.
    ///
    /// Self-pay carries no contractual adjustment and the patient owes all
    /// net charges.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for policy in [
            PayerPolicy {
                payer: PayerCategory::Medicare,
                contractual_adjustment_rate: 0.20,
                coinsurance_rate: 0.20,
            },
            PayerPolicy {
                payer: PayerCategory::Medicaid,
                contractual_adjustment_rate: 0.35,
                coinsurance_rate: 0.0,
            },
            PayerPolicy {
                payer: PayerCategory::Commercial,
                contractual_adjustment_rate: 0.15,
                coinsurance_rate: 0.25,
            },
            PayerPolicy {
                payer: PayerCategory::SelfPay,
                contractual_adjustment_rate: 0.0,
                coinsurance_rate: 1.0,
            },
            PayerPolicy {
                payer: PayerCategory::WorkersComp,
                contractual_adjustment_rate: 0.25,
                coinsurance_rate: 0.0,
            },
        ] {
            table.upsert(policy);
        }
        table
    }

    pub fn upsert(&mut self, policy: PayerPolicy) {
        self.policies.insert(policy.payer, policy);
    }

    pub fn get(&self, payer: PayerCategory) -> Option<&PayerPolicy> {
        self.policies.get(&payer)
    }
}
