use uuid::Uuid;

use crate::catalog::ProcedureCatalog;
use crate::claim::{Claim, ClaimLineItem, ClaimStatus};
use crate::error::{ClaimError, ClaimResult};
use crate::money::Money;
use crate::policy::PayerPolicyTable;
use crate::schema::ClaimRequest;

/// Caller-supplied discount applied after the contractual allowance.
///
/// Clamped so the discount never exceeds what remains of gross charges
/// once the allowance is written off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Discount {
    Flat(Money),
    PercentOfGross(f64),
}

/// Options for [`build_claim`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub discount: Option<Discount>,
    /// Refuse to build a claim whose benefits have not been verified.
    pub require_eligibility: bool,
}

/// Build a `Draft` claim from an intake request.
///
/// Pure function: resolves every line against the catalog, applies the
/// payer policy, and returns the fully priced claim. Inserting into the
/// ledger is a separate explicit step, which keeps pricing independently
/// testable.
///
/// Computation order:
/// 1. gross charges = sum of catalog price x quantity per line
/// 2. contractual allowance = gross x adjustment rate
/// 3. discount, clamped to gross - allowance
/// 4. net charges = gross - allowance - discount
/// 5. patient responsibility = net x coinsurance rate
/// 6. insurance payment = net - patient responsibility
pub fn build_claim(
    catalog: &ProcedureCatalog,
    policies: &PayerPolicyTable,
    request: &ClaimRequest,
    options: &BuildOptions,
) -> ClaimResult<Claim> {
    if options.require_eligibility && !request.eligibility_verified {
        return Err(ClaimError::EligibilityNotVerified);
    }
    if request.lines.is_empty() {
        return Err(ClaimError::EmptyClaim);
    }

    let policy = policies
        .get(request.payer)
        .copied()
        .ok_or(ClaimError::MissingPayerPolicy(request.payer))?;

    let mut line_items = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        let procedure = catalog
            .get(&line.procedure_code)
            .ok_or_else(|| ClaimError::UnknownProcedureCode(line.procedure_code.clone()))?;
        if line.quantity < 1 {
            return Err(ClaimError::InvalidQuantity {
                code: line.procedure_code.clone(),
                quantity: line.quantity,
            });
        }
        let extended_price = Money::from_cents(procedure.price.cents() * line.quantity as i64);
        line_items.push(ClaimLineItem {
            procedure_code: procedure.code.clone(),
            description: procedure.name.clone(),
            quantity: line.quantity,
            unit_price: procedure.price,
            extended_price,
        });
    }

    let gross_charges: Money = line_items.iter().map(|l| l.extended_price).sum();
    let contractual_allowance = gross_charges.apply_rate(policy.contractual_adjustment_rate);
    let discount = resolve_discount(options.discount, gross_charges, contractual_allowance)?;
    let net_charges = gross_charges - contractual_allowance - discount;
    let patient_responsibility = net_charges.apply_rate(policy.coinsurance_rate);
    // Remainder goes to the insurer so the two sides always reconcile to net
    let insurance_payment = net_charges - patient_responsibility;

    Ok(Claim {
        claim_id: Uuid::new_v4(),
        claim_number: None,
        patient_id: request.patient_id.clone(),
        date_of_service: request.date_of_service,
        payer: request.payer,
        line_items,
        status: ClaimStatus::Draft,
        gross_charges,
        contractual_allowance,
        discount,
        net_charges,
        patient_responsibility,
        insurance_payment,
        paid_amount: Money::ZERO,
        balance: net_charges,
        denial_code: None,
        denial_reason: None,
        prior_authorization: request.prior_authorization.clone(),
        eligibility_verified: request.eligibility_verified,
    })
}

fn resolve_discount(
    discount: Option<Discount>,
    gross_charges: Money,
    contractual_allowance: Money,
) -> ClaimResult<Money> {
    let requested = match discount {
        None => return Ok(Money::ZERO),
        Some(Discount::Flat(amount)) => {
            if !amount.is_positive() {
                return Err(ClaimError::NegativeOrZeroAmount(amount));
            }
            amount
        }
        Some(Discount::PercentOfGross(rate)) => {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ClaimError::InvalidRate(rate));
            }
            gross_charges.apply_rate(rate)
        }
    };
    Ok(requested.min(gross_charges - contractual_allowance))
}
