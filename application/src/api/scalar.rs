//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Helper type to use in `#[graphql(with = ..)]` attribute.
///
/// Uses [`FromStr`]/[`Display`] impls of `As` type to convert the target type
/// to/from GraphQL scalar.
///
/// Target type must implement [`TryFrom`] and [`AsRef`] for `As` type.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Convert the target type into scalar [`Value`] by using [`Display`] impl
    /// of `As` type.
    ///
    /// [`Display`]: fmt::Display
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Constructs the target type from scalar [`Value`] by using [`FromStr`]
    /// impl of `As` type.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the input value is not a string;
    /// - the input value cannot be parsed into `As` type;
    /// - the parsed value cannot be converted into the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let name = type_name::<T, S>();
        let s = input.as_string_value().ok_or_else(|| {
            format!(
                "Cannot parse input scalar `{name}`: expected string input \
                 value, found: {input}",
            )
        })?;
        s.parse::<As>()
            .map_err(|e| {
                format!("Cannot parse input scalar `{name}` from \"{s}\": {e}")
            })?
            .try_into()
            .map_err(|e| format!("Cannot parse input scalar `{name}`: {e}"))
    }

    /// Parse the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

/// Helper type to use in `#[graphql(with = ..)]` attribute for scalars
/// represented as a GraphQL `Int`.
///
/// Target type must be convertible into [`i32`] and constructible out of it
/// via [`TryFrom`].
#[derive(Debug)]
pub struct ViaInt;

impl ViaInt {
    /// Converts the target type into `Int` scalar [`Value`].
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        T: Copy + Into<i32>,
        S: ScalarValue,
    {
        let int: i32 = (*value).into();
        Value::scalar(int)
    }

    /// Constructs the target type from `Int` scalar [`Value`].
    ///
    /// # Errors
    ///
    /// Returns an error if the input value is not an `Int`, or is not
    /// acceptable by the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        T: TryFrom<i32> + GraphQLType<S, TypeInfo = ()>,
        S: ScalarValue,
    {
        let name = type_name::<T, S>();
        input
            .as_int_value()
            .ok_or_else(|| {
                format!(
                    "Cannot parse input scalar `{name}`: expected `Int` \
                     input value, found: {input}",
                )
            })?
            .try_into()
            .map_err(|_| {
                format!("Cannot parse input scalar `{name}` from {input}")
            })
    }

    /// Parse the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`i32`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <i32 as ParseScalarValue<S>>::from_str(value)
    }
}

/// Returns the GraphQL name of the `T` type.
fn type_name<T, S>() -> String
where
    T: GraphQLType<S, TypeInfo = ()>,
    S: ScalarValue,
{
    T::name(&()).unwrap_or("scalar").to_owned()
}
