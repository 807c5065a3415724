use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::claim::ClaimStatus;
use crate::ledger::LedgerSnapshot;
use crate::money::Money;

/// Age range since date of service. Ties go to the lower bucket: exactly
/// 30 days is `0-30`, exactly 90 days is `61-90`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeRange {
    ZeroToThirty,
    ThirtyOneToSixty,
    SixtyOneToNinety,
    OverNinety,
}

pub const AGE_RANGES: [AgeRange; 4] = [
    AgeRange::ZeroToThirty,
    AgeRange::ThirtyOneToSixty,
    AgeRange::SixtyOneToNinety,
    AgeRange::OverNinety,
];

impl AgeRange {
    pub fn from_days(days: i64) -> AgeRange {
        match days {
            ..=30 => AgeRange::ZeroToThirty,
            31..=60 => AgeRange::ThirtyOneToSixty,
            61..=90 => AgeRange::SixtyOneToNinety,
            _ => AgeRange::OverNinety,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeRange::ZeroToThirty => "0-30",
            AgeRange::ThirtyOneToSixty => "31-60",
            AgeRange::SixtyOneToNinety => "61-90",
            AgeRange::OverNinety => "90+",
        }
    }
}

/// Derived projection of outstanding balances for one age range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingBucket {
    pub range: AgeRange,
    pub claim_count: usize,
    pub total_balance: Money,
}

/// Portfolio KPI bundle for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub as_of: NaiveDate,
    pub total_claims: usize,
    pub total_ar: Money,
    pub days_in_ar: f64,
    pub net_collection_rate: f64,
    pub denial_rate: f64,
    pub gross_charges: Money,
    pub net_charges: Money,
    pub collected: Money,
    pub aging: [AgingBucket; 4],
}

/// Partition claims with an outstanding balance into the four aging ranges
/// by days since date of service.
pub fn aging_buckets(snapshot: &LedgerSnapshot, as_of: NaiveDate) -> [AgingBucket; 4] {
    let mut buckets = AGE_RANGES.map(|range| AgingBucket {
        range,
        claim_count: 0,
        total_balance: Money::ZERO,
    });

    for claim in &snapshot.claims {
        if !claim.balance.is_positive() {
            continue;
        }
        let days = (as_of - claim.date_of_service).num_days();
        let index = AgeRange::from_days(days) as usize;
        buckets[index].claim_count += 1;
        buckets[index].total_balance += claim.balance;
    }
    buckets
}

/// Total outstanding balance across the portfolio.
pub fn total_ar(snapshot: &LedgerSnapshot) -> Money {
    snapshot.claims.iter().map(|c| c.balance).sum()
}

/// Mean age in days of claims carrying a balance; zero when nothing is
/// outstanding.
pub fn days_in_ar(snapshot: &LedgerSnapshot, as_of: NaiveDate) -> f64 {
    let ages: Vec<i64> = snapshot
        .claims
        .iter()
        .filter(|c| c.balance.is_positive())
        .map(|c| (as_of - c.date_of_service).num_days())
        .collect();
    if ages.is_empty() {
        return 0.0;
    }
    ages.iter().sum::<i64>() as f64 / ages.len() as f64
}

/// Percentage of post-adjustment charges actually collected.
pub fn net_collection_rate(snapshot: &LedgerSnapshot) -> f64 {
    let billed: Money = snapshot.claims.iter().map(|c| c.net_charges).sum();
    if !billed.is_positive() {
        return 0.0;
    }
    let outstanding = total_ar(snapshot);
    (billed - outstanding).cents() as f64 / billed.cents() as f64 * 100.0
}

/// Percentage of claims currently denied or under appeal.
pub fn denial_rate(snapshot: &LedgerSnapshot) -> f64 {
    if snapshot.claims.is_empty() {
        return 0.0;
    }
    let denied = snapshot
        .claims
        .iter()
        .filter(|c| matches!(c.status, ClaimStatus::Denied | ClaimStatus::Appeal))
        .count();
    denied as f64 / snapshot.claims.len() as f64 * 100.0
}

/// Cash received in `[start, end)`, attributed by payment posting time.
pub fn revenue_in_window(
    snapshot: &LedgerSnapshot,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Money {
    snapshot
        .payments
        .iter()
        .filter(|p| p.posted_at >= start && p.posted_at < end)
        .map(|p| p.amount)
        .sum()
}

/// Compute the full KPI bundle from one snapshot.
pub fn kpis(snapshot: &LedgerSnapshot, as_of: NaiveDate) -> Kpis {
    Kpis {
        as_of,
        total_claims: snapshot.claims.len(),
        total_ar: total_ar(snapshot),
        days_in_ar: days_in_ar(snapshot, as_of),
        net_collection_rate: net_collection_rate(snapshot),
        denial_rate: denial_rate(snapshot),
        gross_charges: snapshot.claims.iter().map(|c| c.gross_charges).sum(),
        net_charges: snapshot.claims.iter().map(|c| c.net_charges).sum(),
        collected: snapshot.claims.iter().map(|c| c.paid_amount).sum(),
        aging: aging_buckets(snapshot, as_of),
    }
}
