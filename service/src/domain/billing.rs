//! Parking fee calculation.

use std::{collections::HashMap, time::Duration};

use common::{Currency, Money};
use rust_decimal::Decimal;

#[cfg(doc)]
use crate::domain::{Slot, Vehicle};
use crate::domain::{
    slot,
    vehicle::{self, Category, EntryDateTime, ExitDateTime},
};

/// Static table of hourly parking rates per [`Category`].
#[derive(Clone, Debug)]
pub struct Tariff {
    /// [`Currency`] all the rates are expressed in.
    pub currency: Currency,

    /// Minimum billed duration of a single parking.
    pub floor: Duration,

    /// Hourly rate of a [`Category`] missing in the [`Tariff::rates`].
    pub default_rate: Decimal,

    /// Hourly rates per [`Category`].
    pub rates: HashMap<Category, Decimal>,
}

impl Tariff {
    /// Returns the hourly rate of the provided [`Category`].
    #[must_use]
    pub fn rate(&self, category: &Category) -> Money {
        Money::new(
            self.rates
                .get(category)
                .copied()
                .unwrap_or(self.default_rate),
            self.currency,
        )
    }

    /// Bills the parking of a [`Vehicle`] of the provided [`Category`] in a
    /// [`Slot`] from `entered_at` till `exited_at`.
    ///
    /// An `exited_at` earlier than `entered_at` is treated as zero duration,
    /// so the [`Bill`] is never negative.
    #[must_use]
    pub fn bill(
        &self,
        vehicle_id: vehicle::Id,
        slot_id: slot::Id,
        category: Category,
        entered_at: EntryDateTime,
        exited_at: ExitDateTime,
    ) -> Bill {
        let parked = exited_at.saturating_duration_since(&entered_at);
        let billed = parked.max(self.floor);
        let rate = self.rate(&category);
        let amount = (rate * hours(billed)).round_to_minor_units();

        Bill {
            vehicle_id,
            slot_id,
            category,
            entered_at,
            exited_at,
            billed_duration: billed,
            rate,
            amount,
        }
    }
}

/// Converts the provided [`Duration`] into fractional hours with a
/// millisecond precision.
fn hours(duration: Duration) -> Decimal {
    const MILLIS_IN_HOUR: u32 = 60 * 60 * 1000;

    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    Decimal::from(millis) / Decimal::from(MILLIS_IN_HOUR)
}

/// Fee charged for a single parking of a [`Vehicle`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bill {
    /// ID of the billed [`Vehicle`].
    pub vehicle_id: vehicle::Id,

    /// ID of the [`Slot`] the [`Vehicle`] was parked in.
    pub slot_id: slot::Id,

    /// [`Category`] of the billed [`Vehicle`].
    pub category: Category,

    /// Moment the [`Vehicle`] entered the [`Slot`].
    pub entered_at: EntryDateTime,

    /// Moment the [`Vehicle`] left the [`Slot`].
    pub exited_at: ExitDateTime,

    /// Duration the fee is charged for, never less than [`Tariff::floor`].
    pub billed_duration: Duration,

    /// Hourly rate applied.
    pub rate: Money,

    /// Charged amount, rounded to minor units.
    pub amount: Money,
}

#[cfg(test)]
mod spec {
    use std::{collections::HashMap, time::Duration};

    use common::{Currency, DateTime, Money};
    use rust_decimal::Decimal;

    use crate::domain::{slot, vehicle};

    use super::Tariff;

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn category(s: &str) -> vehicle::Category {
        vehicle::Category::new(s).unwrap()
    }

    fn tariff() -> Tariff {
        Tariff {
            currency: Currency::Inr,
            floor: Duration::from_secs(15 * 60),
            default_rate: decimal("10"),
            rates: HashMap::from([
                (category("2-wheeler"), decimal("5")),
                (category("4-wheeler"), decimal("50")),
                (category("bicycle"), decimal("2")),
            ]),
        }
    }

    fn amount_for(parked: Duration, cat: &str) -> Money {
        amount_by(&tariff(), parked, cat)
    }

    fn amount_by(tariff: &Tariff, parked: Duration, cat: &str) -> Money {
        let entered_at: vehicle::EntryDateTime =
            DateTime::from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .coerce();
        let exited_at = (entered_at + parked).coerce();
        tariff
            .bill(
                vehicle::Id::new(),
                slot::Id::new(1).unwrap(),
                category(cat),
                entered_at,
                exited_at,
            )
            .amount
    }

    #[test]
    fn bills_by_hourly_rate() {
        assert_eq!(
            amount_for(Duration::from_secs(90 * 60), "4-wheeler"),
            Money::new(decimal("75.00"), Currency::Inr),
        );
        assert_eq!(
            amount_for(Duration::from_secs(2 * 60 * 60), "2-wheeler"),
            Money::new(decimal("10.00"), Currency::Inr),
        );
    }

    #[test]
    fn bills_at_least_the_floor() {
        assert_eq!(
            amount_for(Duration::from_secs(5 * 60), "unknown"),
            Money::new(decimal("2.50"), Currency::Inr),
        );
        assert_eq!(
            amount_for(Duration::ZERO, "bicycle"),
            Money::new(decimal("0.50"), Currency::Inr),
        );

        let mut t = tariff();
        _ = t.rates.insert(category("bicycle"), decimal("10"));
        assert_eq!(
            amount_by(&t, Duration::from_secs(5 * 60), "bicycle"),
            Money::new(decimal("2.50"), Currency::Inr),
        );
    }

    #[test]
    fn falls_back_to_default_rate() {
        let t = tariff();

        assert_eq!(t.rate(&category("truck")).amount, decimal("10"));
        assert_eq!(t.rate(&category("bicycle")).amount, decimal("2"));
    }

    #[test]
    fn clamps_clock_skew_to_the_floor() {
        let exited_at = DateTime::from_rfc3339("2024-05-01T10:00:00Z").unwrap();
        let entered_at = exited_at + Duration::from_secs(60 * 60);

        let bill = tariff().bill(
            vehicle::Id::new(),
            slot::Id::new(1).unwrap(),
            category("4-wheeler"),
            entered_at.coerce(),
            exited_at.coerce(),
        );

        assert_eq!(bill.billed_duration, Duration::from_secs(15 * 60));
        assert_eq!(bill.amount.amount, decimal("12.50"));
    }

    #[test]
    fn is_monotonic_in_duration() {
        let mut previous = Decimal::ZERO;
        for minutes in [0, 10, 15, 16, 59, 60, 61, 600, 6000] {
            let amount =
                amount_for(Duration::from_secs(minutes * 60), "4-wheeler")
                    .amount;
            assert!(amount >= previous, "{minutes} minutes billed less");
            previous = amount;
        }
    }

    #[test]
    fn rounds_to_minor_units() {
        let mut t = tariff();
        t.floor = Duration::ZERO;
        t.default_rate = decimal("1");
        let entered_at: vehicle::EntryDateTime =
            DateTime::from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .coerce();
        let exited_at = (entered_at + Duration::from_secs(10 * 60)).coerce();

        let bill = t.bill(
            vehicle::Id::new(),
            slot::Id::new(1).unwrap(),
            category("van"),
            entered_at,
            exited_at,
        );

        // 10 minutes of 1/h is 0.1666...
        assert_eq!(bill.amount.amount, decimal("0.17"));
        assert_eq!(bill.amount.amount.scale(), 2);
    }
}
