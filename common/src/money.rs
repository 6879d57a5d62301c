//! [`Money`]-related definitions.

use std::{fmt, ops, str::FromStr};

use rust_decimal::{prelude::ToPrimitive as _, Decimal};

use crate::define_kind;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Number of minor units digits (cents, paise) every [`Currency`] has.
    pub const MINOR_UNITS: u32 = 2;

    /// Creates a new [`Money`] of the provided `amount` in `currency`.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Rounds this [`Money`] to whole minor units, using banker's rounding.
    ///
    /// The resulting amount always has exactly [`Money::MINOR_UNITS`]
    /// fractional digits.
    #[must_use]
    pub fn round_to_minor_units(self) -> Self {
        let mut amount = self.amount.round_dp(Self::MINOR_UNITS);
        amount.rescale(Self::MINOR_UNITS);
        Self { amount, ..self }
    }
}

impl ops::Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self {
            amount: self.amount * rhs,
            currency: self.currency,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        if amount.is_integer() {
            write!(f, "{}{currency}", amount.to_i128().expect("integer"))
        } else {
            write!(f, "{amount}{currency}")
        }
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 4 {
            return Err("too short");
        }

        let (amount, currency) = s.split_at(s.len() - 3);
        let amount = Decimal::from_str(amount).map_err(|_| "invalid amount")?;
        let currency =
            Currency::from_str(currency).map_err(|_| "invalid currency")?;

        Ok(Self { amount, currency })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "US Dollar."]
        Usd = 1,

        #[doc = "Euro."]
        Eur = 2,

        #[doc = "Indian Rupee."]
        Inr = 3,
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in `{major}.{minor}{currency}` format, where:
    /// - `major` is an integer;
    /// - `minor` is an optional integer;
    /// - `currency` is a three-letter currency code.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Money` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Money` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Money::from_str("123.45INR").unwrap(),
            Money::new(decimal("123.45"), Currency::Inr),
        );
        assert_eq!(
            Money::from_str("0.5USD").unwrap(),
            Money::new(decimal("0.5"), Currency::Usd),
        );

        assert!(Money::from_str("123.45").is_err());
        assert!(Money::from_str("123.45In").is_err());
        assert!(Money::from_str("123.45Rupees").is_err());
        assert!(Money::from_str("12O.00EUR").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(
            Money::new(decimal("2.50"), Currency::Inr).to_string(),
            "2.50INR",
        );
        assert_eq!(
            Money::new(decimal("75.00"), Currency::Inr).to_string(),
            "75INR",
        );
    }

    #[test]
    fn rounds_to_minor_units() {
        let round = |s| {
            Money::new(decimal(s), Currency::Inr)
                .round_to_minor_units()
                .amount
        };

        assert_eq!(round("75"), decimal("75.00"));
        assert_eq!(round("75").scale(), 2);
        assert_eq!(round("2.5"), decimal("2.50"));
        assert_eq!(round("1.234"), decimal("1.23"));
        assert_eq!(round("1.236"), decimal("1.24"));
        // Banker's rounding on the exact midpoint.
        assert_eq!(round("1.125"), decimal("1.12"));
        assert_eq!(round("1.135"), decimal("1.14"));
    }

    #[test]
    fn multiplies_by_decimal() {
        let rate = Money::new(decimal("50"), Currency::Inr);

        assert_eq!(
            (rate * decimal("1.5")).round_to_minor_units(),
            Money::new(decimal("75.00"), Currency::Inr),
        );
    }
}
