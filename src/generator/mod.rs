//! Synthetic value generation.
//!
//! The engine only sees the `ValueGenerator` trait; `FakerGenerator` is the
//! bundled implementation built on the `fake` crate with a seedable RNG so
//! runs are reproducible.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use fake::faker::address::en::{CityName, StateName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::MaskingType;
use crate::sql::{SqlType, SqlValue};

const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A fully resolved generation request: bounds are already defaulted and
/// clipped by the caller.
#[derive(Debug)]
pub struct GenerateRequest<'a> {
    pub masking_type: MaskingType,
    pub sub_type: Option<&'a str>,
    pub data_type: SqlType,
    pub min: f64,
    pub max: f64,
    pub character_string: Option<&'a str>,
    pub format: Option<&'a str>,
    /// Existing cell value, consumed by the shuffle type
    pub original: Option<&'a SqlValue>,
}

/// Source of synthetic values.
pub trait ValueGenerator {
    fn generate(&mut self, request: &GenerateRequest<'_>) -> anyhow::Result<SqlValue>;
}

/// Generator backed by the `fake` crate and a seedable RNG.
pub struct FakerGenerator {
    rng: StdRng,
    #[allow(dead_code)] // retained for locale-aware fakers
    locale: String,
}

impl FakerGenerator {
    pub fn new(seed: Option<u64>, locale: String) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self { rng, locale }
    }

    fn random_string(&mut self, len_min: f64, len_max: f64, alphabet: Option<&str>) -> String {
        let alphabet: Vec<char> = alphabet
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_ALPHABET)
            .chars()
            .collect();
        let lo = len_min.max(1.0) as usize;
        let hi = (len_max.max(len_min)) as usize;
        let len = if hi > lo {
            self.rng.random_range(lo..=hi)
        } else {
            lo
        };
        (0..len)
            .map(|_| alphabet[self.rng.random_range(0..alphabet.len())])
            .collect()
    }

    fn random_int(&mut self, min: f64, max: f64) -> i64 {
        let lo = min as i64;
        let hi = (max as i64).max(lo);
        if hi > lo {
            self.rng.random_range(lo..=hi)
        } else {
            lo
        }
    }

    fn random_decimal(&mut self, min: f64, max: f64) -> f64 {
        let raw = if max > min {
            self.rng.random_range(min..max)
        } else {
            min
        };
        (raw * 100.0).round() / 100.0
    }

    fn random_date(&mut self, min_days: f64, max_days: f64) -> NaiveDate {
        let today = chrono::Local::now().date_naive();
        today + Duration::days(self.random_int(min_days, max_days))
    }

    fn random_time(&mut self) -> NaiveTime {
        NaiveTime::from_hms_opt(
            self.rng.random_range(0..24),
            self.rng.random_range(0..60),
            self.rng.random_range(0..60),
        )
        .unwrap_or_default()
    }

    fn random_datetime(&mut self, min_days: f64, max_days: f64) -> NaiveDateTime {
        self.random_date(min_days, max_days).and_time(self.random_time())
    }

    /// Rearrange the characters of the existing value. Numeric values keep
    /// their sign in place and their first decimal/thousands separator at its
    /// original offset.
    fn shuffle_text(&mut self, original: &SqlValue, data_type: SqlType) -> String {
        let text = original.canonical_text();
        if text.chars().count() < 2 {
            return text;
        }

        if data_type.is_numeric() {
            let (sign, body) = match text.strip_prefix('-') {
                Some(rest) => ("-", rest),
                None => ("", &text[..]),
            };
            let separator = body.char_indices().find(|(_, c)| *c == '.' || *c == ',');
            let mut digits: Vec<char> = body.chars().filter(|c| *c != '.' && *c != ',').collect();
            digits.shuffle(&mut self.rng);
            let mut shuffled: String = digits.into_iter().collect();
            if let Some((offset, sep)) = separator {
                if offset <= shuffled.len() {
                    shuffled.insert(offset, sep);
                }
            }
            return format!("{}{}", sign, shuffled);
        }

        let mut chars: Vec<char> = text.chars().collect();
        chars.shuffle(&mut self.rng);
        chars.into_iter().collect()
    }
}

impl ValueGenerator for FakerGenerator {
    fn generate(&mut self, request: &GenerateRequest<'_>) -> anyhow::Result<SqlValue> {
        let value = match request.masking_type {
            MaskingType::Name => match request.sub_type {
                Some("first") => SqlValue::Str(FirstName().fake_with_rng(&mut self.rng)),
                Some("last") => SqlValue::Str(LastName().fake_with_rng(&mut self.rng)),
                _ => SqlValue::Str(Name().fake_with_rng(&mut self.rng)),
            },
            MaskingType::FirstName => SqlValue::Str(FirstName().fake_with_rng(&mut self.rng)),
            MaskingType::LastName => SqlValue::Str(LastName().fake_with_rng(&mut self.rng)),
            MaskingType::Email => SqlValue::Str(SafeEmail().fake_with_rng(&mut self.rng)),
            MaskingType::Phone => SqlValue::Str(PhoneNumber().fake_with_rng(&mut self.rng)),
            MaskingType::Username => SqlValue::Str(Username().fake_with_rng(&mut self.rng)),
            MaskingType::Address => {
                let street: String = StreetName().fake_with_rng(&mut self.rng);
                let city: String = CityName().fake_with_rng(&mut self.rng);
                let state: String = StateName().fake_with_rng(&mut self.rng);
                let zip: String = ZipCode().fake_with_rng(&mut self.rng);
                SqlValue::Str(format!("{}, {}, {} {}", street, city, state, zip))
            }
            MaskingType::City => SqlValue::Str(CityName().fake_with_rng(&mut self.rng)),
            MaskingType::State => SqlValue::Str(StateName().fake_with_rng(&mut self.rng)),
            MaskingType::Zip => SqlValue::Str(ZipCode().fake_with_rng(&mut self.rng)),
            MaskingType::Country => SqlValue::Str("United States".to_string()),
            MaskingType::Company => SqlValue::Str(CompanyName().fake_with_rng(&mut self.rng)),
            MaskingType::JobTitle => {
                let titles = [
                    "Software Engineer",
                    "Product Manager",
                    "Data Analyst",
                    "Designer",
                    "Marketing Manager",
                    "Sales Representative",
                    "Customer Support",
                    "Operations Manager",
                ];
                SqlValue::Str(titles[self.rng.random_range(0..titles.len())].to_string())
            }
            MaskingType::Url => SqlValue::Str(format!(
                "https://example{}.com/{}",
                self.rng.random_range(1..1000),
                Word().fake_with_rng::<String, _>(&mut self.rng)
            )),
            MaskingType::Ip => {
                if request.sub_type == Some("v6") {
                    SqlValue::Str(format!(
                        "{:x}:{:x}:{:x}:{:x}:{:x}:{:x}:{:x}:{:x}",
                        self.rng.random_range(0..0xFFFF_u16),
                        self.rng.random_range(0..0xFFFF_u16),
                        self.rng.random_range(0..0xFFFF_u16),
                        self.rng.random_range(0..0xFFFF_u16),
                        self.rng.random_range(0..0xFFFF_u16),
                        self.rng.random_range(0..0xFFFF_u16),
                        self.rng.random_range(0..0xFFFF_u16),
                        self.rng.random_range(0..0xFFFF_u16)
                    ))
                } else {
                    SqlValue::Str(format!(
                        "{}.{}.{}.{}",
                        self.rng.random_range(1..255),
                        self.rng.random_range(0..255),
                        self.rng.random_range(0..255),
                        self.rng.random_range(1..255)
                    ))
                }
            }
            MaskingType::Guid => SqlValue::Str(format!(
                "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
                self.rng.random::<u32>(),
                self.rng.random::<u16>(),
                (self.rng.random::<u16>() & 0x0FFF) | 0x4000, // Version 4
                (self.rng.random::<u16>() & 0x3FFF) | 0x8000, // Variant
                self.rng.random::<u64>() & 0xFFFF_FFFF_FFFF_u64
            )),
            MaskingType::CreditCard => SqlValue::Str(format!(
                "{:04}-{:04}-{:04}-{:04}",
                self.rng.random_range(1000..9999),
                self.rng.random_range(1000..9999),
                self.rng.random_range(1000..9999),
                self.rng.random_range(1000..9999)
            )),
            MaskingType::Iban => SqlValue::Str(format!(
                "DE{:02}{:04}{:04}{:04}{:04}{:02}",
                self.rng.random_range(10..99),
                self.rng.random_range(1000..9999),
                self.rng.random_range(1000..9999),
                self.rng.random_range(1000..9999),
                self.rng.random_range(1000..9999),
                self.rng.random_range(10..99)
            )),
            MaskingType::Ssn => SqlValue::Str(format!(
                "{:03}-{:02}-{:04}",
                self.rng.random_range(100..999),
                self.rng.random_range(10..99),
                self.rng.random_range(1000..9999)
            )),
            MaskingType::Lorem => SqlValue::Str(Paragraph(3..5).fake_with_rng(&mut self.rng)),
            MaskingType::Sentence => SqlValue::Str(Sentence(5..10).fake_with_rng(&mut self.rng)),
            MaskingType::Word => SqlValue::Str(Word().fake_with_rng(&mut self.rng)),
            MaskingType::String => SqlValue::Str(self.random_string(
                request.min,
                request.max,
                request.character_string,
            )),
            MaskingType::Number => SqlValue::Int(self.random_int(request.min, request.max)),
            MaskingType::Decimal => SqlValue::Float(self.random_decimal(request.min, request.max)),
            MaskingType::Bool => SqlValue::Bool(self.rng.random()),
            MaskingType::Date => SqlValue::Date(self.random_date(request.min, request.max)),
            MaskingType::Time => SqlValue::Time(self.random_time()),
            MaskingType::DateTime => {
                SqlValue::DateTime(self.random_datetime(request.min, request.max))
            }
            MaskingType::Shuffle => {
                let original = request
                    .original
                    .ok_or_else(|| anyhow::anyhow!("shuffle requires an existing value"))?;
                if original.is_null() {
                    SqlValue::Null
                } else {
                    SqlValue::Str(self.shuffle_text(original, request.data_type))
                }
            }
        };
        Ok(value)
    }
}
