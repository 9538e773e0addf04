//! Fake value generation for seed tables.
//!
//! The query factories never call a generator per target row; generators are
//! only invoked while populating the seed table, so the call budget is
//! `seed_rows x distinct_fields` regardless of how large the target tables are.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use fake::faker::address::en::{CityName, StateName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// Semantic type a generator declares for its values. Each dialect maps these
/// to concrete column types when building the seed table DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeDataType {
    String,
    Int,
    Date,
    DateTime,
}

/// A generated value, carried typed so INSERT literals can be escaped
/// correctly (strings quoted, integers bare).
#[derive(Debug, Clone, PartialEq)]
pub enum FakeValue {
    String(String),
    Int(i64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Capability consumed by the seed table builder: a semantic data type plus
/// freshly generated values on demand.
pub trait FakeColumnGenerator: fmt::Debug + Send + Sync {
    fn data_type(&self) -> FakeDataType;
    fn value(&self) -> FakeValue;
}

pub type GeneratorRef = Arc<dyn FakeColumnGenerator>;

/// Generator for a single logical field, backed by the `fake` crate.
///
/// Construction fails (returns `None`) for field names the registry does not
/// know, which surfaces as an unknown-fake-field error at strategy-load time.
#[derive(Debug, Clone)]
pub struct FakerColumn {
    field: String,
    data_type: FakeDataType,
}

impl FakerColumn {
    pub fn for_field(field: &str) -> Option<Self> {
        let data_type = field_data_type(field)?;
        Some(Self {
            field: field.to_string(),
            data_type,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Declared type per field key. `None` means the field is unknown.
fn field_data_type(field: &str) -> Option<FakeDataType> {
    let data_type = match field {
        "first_name" | "last_name" | "name" | "full_name" | "email" | "safe_email"
        | "user_name" | "phone_number" | "street_address" | "city" | "state" | "zipcode"
        | "postcode" | "country" | "company" | "company_name" | "url" | "ipv4" | "ipv4_public"
        | "uuid4" | "ssn" | "word" | "sentence" | "paragraph" | "text" => FakeDataType::String,
        "random_int" | "age" => FakeDataType::Int,
        "date_of_birth" | "past_date" => FakeDataType::Date,
        "date_time" | "past_datetime" => FakeDataType::DateTime,
        _ => return None,
    };
    Some(data_type)
}

impl FakeColumnGenerator for FakerColumn {
    fn data_type(&self) -> FakeDataType {
        self.data_type
    }

    fn value(&self) -> FakeValue {
        let mut rng = rand::rng();

        match self.field.as_str() {
            "first_name" => FakeValue::String(FirstName().fake_with_rng(&mut rng)),
            "last_name" => FakeValue::String(LastName().fake_with_rng(&mut rng)),
            "name" | "full_name" => FakeValue::String(Name().fake_with_rng(&mut rng)),
            "email" | "safe_email" => FakeValue::String(SafeEmail().fake_with_rng(&mut rng)),
            "user_name" => FakeValue::String(Username().fake_with_rng(&mut rng)),
            "phone_number" => FakeValue::String(PhoneNumber().fake_with_rng(&mut rng)),
            "street_address" => {
                let street: String = StreetName().fake_with_rng(&mut rng);
                let number = rng.random_range(1..2000);
                FakeValue::String(format!("{} {}", number, street))
            }
            "city" => FakeValue::String(CityName().fake_with_rng(&mut rng)),
            "state" => FakeValue::String(StateName().fake_with_rng(&mut rng)),
            "zipcode" | "postcode" => FakeValue::String(ZipCode().fake_with_rng(&mut rng)),
            "country" => FakeValue::String("United States".to_string()),
            "company" | "company_name" => FakeValue::String(CompanyName().fake_with_rng(&mut rng)),
            "url" => FakeValue::String(format!(
                "https://example{}.com/{}",
                rng.random_range(1..1000),
                Word().fake_with_rng::<String, _>(&mut rng)
            )),
            "ipv4" | "ipv4_public" => FakeValue::String(format!(
                "{}.{}.{}.{}",
                rng.random_range(1..255),
                rng.random_range(0..255),
                rng.random_range(0..255),
                rng.random_range(1..255)
            )),
            "uuid4" => FakeValue::String(format!(
                "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
                rng.random::<u32>(),
                rng.random::<u16>(),
                (rng.random::<u16>() & 0x0FFF) | 0x4000,
                (rng.random::<u16>() & 0x3FFF) | 0x8000,
                rng.random::<u64>() & 0xFFFF_FFFF_FFFF_u64
            )),
            "ssn" => FakeValue::String(format!(
                "{:03}-{:02}-{:04}",
                rng.random_range(100..999),
                rng.random_range(10..99),
                rng.random_range(1000..9999)
            )),
            "word" => FakeValue::String(Word().fake_with_rng(&mut rng)),
            "sentence" => FakeValue::String(Sentence(5..10).fake_with_rng(&mut rng)),
            "paragraph" | "text" => FakeValue::String(Paragraph(3..5).fake_with_rng(&mut rng)),
            "random_int" => FakeValue::Int(rng.random_range(0..10000)),
            "age" => FakeValue::Int(rng.random_range(18..90)),
            "date_of_birth" | "past_date" => FakeValue::Date(random_date(&mut rng)),
            "date_time" | "past_datetime" => {
                let date = random_date(&mut rng);
                let time = NaiveTime::from_hms_opt(
                    rng.random_range(0..24),
                    rng.random_range(0..60),
                    rng.random_range(0..60),
                )
                .unwrap_or_default();
                FakeValue::DateTime(NaiveDateTime::new(date, time))
            }
            // for_field rejects anything else at construction
            other => FakeValue::String(format!("FAKE_{}", other)),
        }
    }
}

fn random_date(rng: &mut impl Rng) -> NaiveDate {
    // day capped at 28 so every month is valid
    NaiveDate::from_ymd_opt(
        rng.random_range(1950..2005),
        rng.random_range(1..=12),
        rng.random_range(1..=28),
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_field_has_declared_type() {
        let gen = FakerColumn::for_field("first_name").unwrap();
        assert_eq!(gen.data_type(), FakeDataType::String);

        let gen = FakerColumn::for_field("age").unwrap();
        assert_eq!(gen.data_type(), FakeDataType::Int);

        let gen = FakerColumn::for_field("date_of_birth").unwrap();
        assert_eq!(gen.data_type(), FakeDataType::Date);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(FakerColumn::for_field("flux_capacitance").is_none());
    }

    #[test]
    fn test_value_matches_declared_type() {
        let gen = FakerColumn::for_field("email").unwrap();
        assert!(matches!(gen.value(), FakeValue::String(_)));

        let gen = FakerColumn::for_field("random_int").unwrap();
        assert!(matches!(gen.value(), FakeValue::Int(_)));

        let gen = FakerColumn::for_field("date_time").unwrap();
        assert!(matches!(gen.value(), FakeValue::DateTime(_)));
    }

    #[test]
    fn test_email_value_looks_like_an_email() {
        let gen = FakerColumn::for_field("email").unwrap();
        match gen.value() {
            FakeValue::String(s) => assert!(s.contains('@')),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_age_is_bounded() {
        let gen = FakerColumn::for_field("age").unwrap();
        for _ in 0..50 {
            match gen.value() {
                FakeValue::Int(n) => assert!((18..90).contains(&n)),
                other => panic!("expected int, got {:?}", other),
            }
        }
    }
}
