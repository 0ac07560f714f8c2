//! Fee quoting — composable pure adjustments applied in a defined order.
//!
//! Each rule inspects the booking and either passes the running total
//! through or adds a named adjustment. Order matters: surcharges compound
//! on the adjusted total, emergency first.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::config::ClinicConfig;

/// Inputs a pricing rule may consult.
#[derive(Debug, Clone, Copy)]
pub struct BookingTerms {
    pub base_fee: f64,
    pub date: NaiveDate,
    pub is_emergency: bool,
}

/// One named fee adjustment.
#[derive(Debug, Clone)]
pub struct FeeAdjustment {
    pub label: &'static str,
    pub amount: f64,
}

/// A quoted fee with its adjustment breakdown.
#[derive(Debug, Clone)]
pub struct FeeQuote {
    pub base: f64,
    pub adjustments: Vec<FeeAdjustment>,
    pub total: f64,
}

type FeeRule = fn(&ClinicConfig, &BookingTerms, f64) -> Option<FeeAdjustment>;

fn emergency_surcharge(
    config: &ClinicConfig,
    terms: &BookingTerms,
    running: f64,
) -> Option<FeeAdjustment> {
    terms.is_emergency.then(|| FeeAdjustment {
        label: "emergency surcharge",
        amount: running * config.emergency_surcharge,
    })
}

fn weekend_surcharge(
    config: &ClinicConfig,
    terms: &BookingTerms,
    running: f64,
) -> Option<FeeAdjustment> {
    matches!(terms.date.weekday(), Weekday::Sat | Weekday::Sun).then(|| FeeAdjustment {
        label: "weekend surcharge",
        amount: running * config.weekend_surcharge,
    })
}

const RULES: &[FeeRule] = &[emergency_surcharge, weekend_surcharge];

/// Quote the fee for a booking by folding the rule list over the base fee.
pub fn quote_fee(config: &ClinicConfig, terms: &BookingTerms) -> FeeQuote {
    let mut total = terms.base_fee;
    let mut adjustments = Vec::new();
    for rule in RULES {
        if let Some(adjustment) = rule(config, terms, total) {
            total += adjustment.amount;
            adjustments.push(adjustment);
        }
    }
    FeeQuote {
        base: terms.base_fee,
        adjustments,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(base: f64, date: NaiveDate, emergency: bool) -> BookingTerms {
        BookingTerms {
            base_fee: base,
            date,
            is_emergency: emergency,
        }
    }

    // 2026-09-01 Tuesday, 2026-09-05 Saturday.
    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }
    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 5).unwrap()
    }

    #[test]
    fn plain_weekday_booking_is_base_fee() {
        let quote = quote_fee(&ClinicConfig::default(), &terms(40.0, tuesday(), false));
        assert_eq!(quote.total, 40.0);
        assert!(quote.adjustments.is_empty());
    }

    #[test]
    fn emergency_adds_half() {
        let quote = quote_fee(&ClinicConfig::default(), &terms(40.0, tuesday(), true));
        assert_eq!(quote.total, 60.0);
        assert_eq!(quote.adjustments[0].label, "emergency surcharge");
    }

    #[test]
    fn surcharges_compound_in_rule_order() {
        // Emergency first (40 → 60), then weekend on the adjusted total
        // (60 → 69).
        let quote = quote_fee(&ClinicConfig::default(), &terms(40.0, saturday(), true));
        assert!((quote.total - 69.0).abs() < 1e-9);
        assert_eq!(quote.adjustments.len(), 2);
    }
}
