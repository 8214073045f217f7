use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Text written in place of a value or year that is missing.
pub const MISSING_MARKER: &str = "NA";

/// A statistical series offered by the API, e.g. total population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Indicator {
    #[serde(serialize_with = "crate::storage::ser_text")]
    pub id: &'static str,
    #[serde(serialize_with = "crate::storage::ser_text")]
    pub label: &'static str,
}

/// Indicators fetched by a plain run of the binary.
pub const DEFAULT_INDICATORS: [&str; 2] = ["SP.POP.TOTL", "NY.GDP.MKTP.CD"];

/// Catalog used by the all-indicators run; also written out as the metadata table.
pub const INDICATORS: [Indicator; 3] = [
    Indicator {
        id: "SP.POP.TOTL",
        label: "Total population",
    },
    Indicator {
        id: "NY.GDP.MKTP.CD",
        label: "GDP (current US $)",
    },
    Indicator {
        id: "NY.GDP.MKTP.PP.CD",
        label: "GDP (PPP, current international $)",
    },
];

/// Metadata section returned by the API (position 0).
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub page: u32,
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub pages: u32,
    /// Some responses encode `per_page` as a string, others as a number.
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub per_page: u32,
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub total: u32,
    #[serde(default, deserialize_with = "de_opt_u32_from_string_or_number")]
    pub sourceid: Option<u32>,
    #[serde(default)]
    pub sourcename: Option<String>,
    #[serde(default)]
    pub lastupdated: Option<String>,
}

/// `u32` that may arrive as a JSON number or a numeric string.
struct LenientU32(u32);

impl<'de> Deserialize<'de> for LenientU32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        struct U32Visitor;

        impl Visitor<'_> for U32Visitor {
            type Value = LenientU32;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a string or integer representing a non-negative number")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u32::try_from(v).map(LenientU32).map_err(E::custom)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u32::try_from(v).map(LenientU32).map_err(E::custom)
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                s.trim().parse::<u32>().map(LenientU32).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(U32Visitor)
    }
}

fn de_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    LenientU32::deserialize(deserializer).map(|v| v.0)
}

fn de_opt_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<LenientU32>::deserialize(deserializer).map(|v| v.map(|v| v.0))
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeName {
    pub id: String,
    pub value: String,
}

/// Raw observation from the API (position 1 array).
#[derive(Debug, Clone, Deserialize)]
pub struct RawObservation {
    pub indicator: CodeName,
    pub country: CodeName,
    pub countryiso3code: String,
    pub date: String,
    #[serde(default)]
    pub value: ObservationValue,
    pub unit: Option<String>,
    pub obs_status: Option<String>,
    pub decimal: Option<i32>,
}

/// A numeric observation, or the explicit absence of one.
///
/// The API reports missing data as `null`; some payloads carry numbers as
/// strings. Numeric strings become [`ObservationValue::Numeric`], anything that
/// does not parse to a finite number becomes [`ObservationValue::Missing`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ObservationValue {
    Numeric(f64),
    #[default]
    Missing,
}

impl ObservationValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            ObservationValue::Numeric(v) => Some(v),
            ObservationValue::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, ObservationValue::Missing)
    }

    fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            ObservationValue::Numeric(v)
        } else {
            ObservationValue::Missing
        }
    }
}

impl From<Option<f64>> for ObservationValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(ObservationValue::Missing, ObservationValue::from_f64)
    }
}

impl fmt::Display for ObservationValue {
    /// Shortest round-trip decimal without exponent; `100.0` prints as `100`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationValue::Numeric(v) => write!(f, "{v}"),
            ObservationValue::Missing => f.write_str(MISSING_MARKER),
        }
    }
}

impl Serialize for ObservationValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObservationValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = ObservationValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a number, a numeric string or null")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(ObservationValue::from_f64(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(ObservationValue::Numeric(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ObservationValue::Numeric(v as f64))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                Ok(s.trim()
                    .parse::<f64>()
                    .map_or(ObservationValue::Missing, ObservationValue::from_f64))
            }

            fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
                Ok(ObservationValue::Missing)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ObservationValue::Missing)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ObservationValue::Missing)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Tidy structure written to disk (one row = one observation).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyRow {
    #[serde(serialize_with = "crate::storage::ser_text")]
    pub country: String,
    #[serde(serialize_with = "ser_year")]
    pub year: Option<i32>,
    pub value: ObservationValue,
}

fn ser_year<S: Serializer>(year: &Option<i32>, serializer: S) -> Result<S::Ok, S::Error> {
    match year {
        Some(y) => serializer.serialize_i32(*y),
        None => serializer.serialize_str(MISSING_MARKER),
    }
}

/// Year from the first four characters of an API date (`"2019"`, `"2019Q1"`, `"2019M03"`).
pub fn year_of(date: &str) -> Option<i32> {
    date.get(..4)?.parse::<i32>().ok()
}

impl From<RawObservation> for TidyRow {
    fn from(o: RawObservation) -> Self {
        Self {
            year: year_of(&o.date),
            country: o.countryiso3code,
            value: o.value,
        }
    }
}

/// Lazily reshape raw observations into tidy rows, one-to-one and in order.
pub fn tidy<I>(raw: I) -> impl Iterator<Item = TidyRow>
where
    I: IntoIterator<Item = RawObservation>,
{
    raw.into_iter().map(TidyRow::from)
}
