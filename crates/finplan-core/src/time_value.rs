use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::types::{Money, Rate};
use crate::PlanResult;

/// Payment timing within each period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnuityTiming {
    /// Payments at the start of each period (SIP convention).
    #[default]
    Due,
    /// Payments at the end of each period.
    Ordinary,
}

/// Period granularity for required-payment solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    Annual,
    Monthly,
}

/// Compute (1 + r)^n via iterative multiplication (avoids Decimal::powd drift).
pub fn compound(rate: Rate, n: u32) -> Decimal {
    let mut result = Decimal::ONE;
    let factor = Decimal::ONE + rate;
    for _ in 0..n {
        result *= factor;
    }
    result
}

/// Future value of a lump sum: FV = PV * (1 + r)^n
pub fn future_value(present: Money, rate: Rate, periods: u32) -> PlanResult<Money> {
    if present < Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "present_value".into(),
            reason: "must be non-negative".into(),
        });
    }
    if rate <= dec!(-1) {
        return Err(PlanningError::InvalidInput {
            field: "rate".into(),
            reason: "must be greater than -100%".into(),
        });
    }
    Ok(present * compound(rate, periods))
}

/// Present value of a lump sum: PV = FV / (1 + r)^n. Inverse of `future_value`.
pub fn present_value(future: Money, rate: Rate, periods: u32) -> PlanResult<Money> {
    if future < Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "future_value".into(),
            reason: "must be non-negative".into(),
        });
    }
    if rate <= dec!(-1) {
        return Err(PlanningError::InvalidInput {
            field: "rate".into(),
            reason: "must be greater than -100%".into(),
        });
    }
    Ok(future / compound(rate, periods))
}

/// Future value of a level annuity.
///
/// Ordinary: FV = pmt * ((1+r)^n - 1) / r. Due multiplies by (1+r).
/// Zero rate falls back to pmt * n.
pub fn future_value_annuity(
    payment: Money,
    rate: Rate,
    periods: u32,
    timing: AnnuityTiming,
) -> PlanResult<Money> {
    if payment < Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "payment".into(),
            reason: "must be non-negative".into(),
        });
    }
    if rate.is_zero() {
        return Ok(payment * Decimal::from(periods));
    }
    let factor = (compound(rate, periods) - Decimal::ONE) / rate;
    let fv = payment * factor;
    Ok(match timing {
        AnnuityTiming::Due => fv * (Decimal::ONE + rate),
        AnnuityTiming::Ordinary => fv,
    })
}

/// Present value of a level annuity: PV = pmt * (1 - (1+r)^-n) / r,
/// with zero-rate fallback pmt * n.
pub fn present_value_annuity(payment: Money, rate: Rate, periods: u32) -> PlanResult<Money> {
    if payment < Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "payment".into(),
            reason: "must be non-negative".into(),
        });
    }
    if rate.is_zero() {
        return Ok(payment * Decimal::from(periods));
    }
    let compound_factor = compound(rate, periods);
    Ok(payment * (Decimal::ONE - Decimal::ONE / compound_factor) / rate)
}

/// Periodic payment (annuity due) required to accumulate `target` over `years`
/// at the given annual rate. Inverts the annuity-due future-value formula.
pub fn required_payment(
    target: Money,
    annual_rate: Rate,
    years: u32,
    frequency: PaymentFrequency,
) -> PlanResult<Money> {
    if target <= Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "target".into(),
            reason: "must be positive".into(),
        });
    }
    if years == 0 {
        return Err(PlanningError::InvalidInput {
            field: "years".into(),
            reason: "must be positive".into(),
        });
    }
    let (rate, periods) = match frequency {
        PaymentFrequency::Annual => (annual_rate, years),
        PaymentFrequency::Monthly => (annual_rate / dec!(12), years * 12),
    };
    if rate.is_zero() {
        return Ok(target / Decimal::from(periods));
    }
    let factor = (compound(rate, periods) - Decimal::ONE) / rate * (Decimal::ONE + rate);
    Ok(target / factor)
}

/// Nominal to real rate via the exact Fisher identity:
/// r_real = (1 + r_nom) / (1 + inflation) - 1.
pub fn nominal_to_real(nominal: Rate, inflation: Rate) -> PlanResult<Rate> {
    if inflation <= dec!(-1) {
        return Err(PlanningError::InvalidInput {
            field: "inflation".into(),
            reason: "must be greater than -100%".into(),
        });
    }
    Ok((Decimal::ONE + nominal) / (Decimal::ONE + inflation) - Decimal::ONE)
}

/// Real to nominal rate, inverse Fisher: r_nom = (1 + r_real)(1 + inflation) - 1.
pub fn real_to_nominal(real: Rate, inflation: Rate) -> PlanResult<Rate> {
    if inflation <= dec!(-1) {
        return Err(PlanningError::InvalidInput {
            field: "inflation".into(),
            reason: "must be greater than -100%".into(),
        });
    }
    Ok((Decimal::ONE + real) * (Decimal::ONE + inflation) - Decimal::ONE)
}

/// Compound annual growth rate: (end / start)^(1/years) - 1.
pub fn cagr(start: Money, end: Money, years: Decimal) -> PlanResult<Rate> {
    if start <= Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "start".into(),
            reason: "must be positive".into(),
        });
    }
    if end <= Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "end".into(),
            reason: "must be positive".into(),
        });
    }
    if years <= Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "years".into(),
            reason: "must be positive".into(),
        });
    }
    Ok((end / start).powd(Decimal::ONE / years) - Decimal::ONE)
}
