//! Conversion of decoded attribute and text values into typed values

use std::any::type_name;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use url::Url;

use crate::error::{Result, ScrapeError};

/// A type an extracted value can be coerced into.
///
/// Implement this for your own types to use them with `attr_as`, `src_as`
/// and `href_as`. [`Parsed`] adapts any `FromStr` type.
pub trait FromAttrValue: Sized {
    fn from_attr_value(value: &str) -> Result<Self>;
}

fn unsupported<T>(value: &str) -> ScrapeError {
    ScrapeError::UnsupportedCoercion {
        value: value.to_string(),
        target: type_name::<T>(),
    }
}

impl FromAttrValue for String {
    fn from_attr_value(value: &str) -> Result<Self> {
        Ok(value.to_string())
    }
}

impl FromAttrValue for Url {
    /// Absolute URIs only
    fn from_attr_value(value: &str) -> Result<Self> {
        Url::parse(value).map_err(|_| unsupported::<Url>(value))
    }
}

impl FromAttrValue for bool {
    fn from_attr_value(value: &str) -> Result<Self> {
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(unsupported::<bool>(value))
        }
    }
}

macro_rules! from_str_coercion {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromAttrValue for $ty {
                fn from_attr_value(value: &str) -> Result<Self> {
                    value.parse::<$ty>().map_err(|_| unsupported::<$ty>(value))
                }
            }
        )*
    };
}

from_str_coercion!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char, IpAddr,
    Ipv4Addr, Ipv6Addr,
);

impl FromAttrValue for DateTime<Utc> {
    /// RFC 3339, RFC 2822, or a bare `YYYY-MM-DD` date at midnight UTC
    fn from_attr_value(value: &str) -> Result<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| unsupported::<DateTime<Utc>>(value))
    }
}

impl FromAttrValue for NaiveDate {
    fn from_attr_value(value: &str) -> Result<Self> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| unsupported::<NaiveDate>(value))
    }
}

impl<T: FromAttrValue> FromAttrValue for Option<T> {
    /// Empty values coerce to `None`
    fn from_attr_value(value: &str) -> Result<Self> {
        if value.is_empty() {
            Ok(None)
        } else {
            T::from_attr_value(value).map(Some)
        }
    }
}

/// Coercion through `FromStr` for types without a dedicated strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Parsed<T>(pub T);

impl<T> Parsed<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: FromStr> FromAttrValue for Parsed<T> {
    fn from_attr_value(value: &str) -> Result<Self> {
        value.parse::<T>().map(Parsed).map_err(|_| unsupported::<T>(value))
    }
}

/// Coerce `value` into `T`
pub fn coerce<T: FromAttrValue>(value: &str) -> Result<T> {
    T::from_attr_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_primitives() {
        assert_eq!(coerce::<i32>("42").unwrap(), 42);
        assert_eq!(coerce::<u8>("255").unwrap(), 255);
        assert_eq!(coerce::<f64>("1.5").unwrap(), 1.5);
        assert_eq!(coerce::<char>("x").unwrap(), 'x');
        assert_eq!(coerce::<String>("as is").unwrap(), "as is");
    }

    #[test]
    fn test_bool_is_case_insensitive() {
        assert!(coerce::<bool>("TRUE").unwrap());
        assert!(!coerce::<bool>("False").unwrap());
        assert!(coerce::<bool>("yes").is_err());
    }

    #[test]
    fn test_failure_names_value_and_target() {
        match coerce::<u8>("256") {
            Err(ScrapeError::UnsupportedCoercion { value, target }) => {
                assert_eq!(value, "256");
                assert_eq!(target, "u8");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_url_must_be_absolute() {
        assert_eq!(
            coerce::<Url>("https://example.com/a").unwrap().as_str(),
            "https://example.com/a"
        );
        assert!(coerce::<Url>("/relative").is_err());
    }

    #[test]
    fn test_ip_addresses() {
        assert_eq!(
            coerce::<IpAddr>("127.0.0.1").unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
        assert_eq!(coerce::<Ipv6Addr>("::1").unwrap(), Ipv6Addr::LOCALHOST);
        assert!(coerce::<Ipv4Addr>("::1").is_err());
    }

    #[test]
    fn test_dates() {
        let dt = coerce::<DateTime<Utc>>("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!((dt.hour(), dt.minute()), (10, 30));

        let dt = coerce::<DateTime<Utc>>("Fri, 01 Mar 2024 12:30:00 GMT").unwrap();
        assert_eq!(dt.day(), 1);

        let dt = coerce::<DateTime<Utc>>("2024-03-01").unwrap();
        assert_eq!((dt.year(), dt.hour()), (2024, 0));

        let date = coerce::<NaiveDate>("2024-02-29").unwrap();
        assert_eq!(date.month(), 2);
        assert!(coerce::<NaiveDate>("2023-02-29").is_err());
    }

    #[test]
    fn test_option_and_parsed() {
        assert_eq!(coerce::<Option<i32>>("").unwrap(), None);
        assert_eq!(coerce::<Option<i32>>("7").unwrap(), Some(7));

        #[derive(Debug, PartialEq)]
        struct Rgb(u8, u8, u8);
        impl FromStr for Rgb {
            type Err = ();
            fn from_str(s: &str) -> std::result::Result<Self, ()> {
                let hex = s.strip_prefix('#').ok_or(())?;
                let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ());
                Ok(Rgb(byte(0)?, byte(2)?, byte(4)?))
            }
        }

        assert_eq!(coerce::<Parsed<Rgb>>("#ff8000").unwrap().into_inner(), Rgb(255, 128, 0));
        assert!(coerce::<Parsed<Rgb>>("orange").is_err());
    }
}
