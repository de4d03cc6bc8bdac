//! Domain library for the Owner/Company registry.
//!
//! This crate holds the record types, identifier newtypes, the filter
//! evaluator, repository ports (traits), the in-memory stores, and the error
//! definitions. Keep HTTP and IO concerns out of this crate.

use std::fmt::{Display, Formatter};
use std::time::SystemTime;

use chrono::NaiveDate;

use crate::validate::{validate_email, validate_identifier};

/// Employer Identification Number; the key of the company store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ein(u64);

impl Ein {
    pub fn new(value: u64) -> Result<Self, CoreError> {
        validate_identifier("ein", value)?;
        Ok(Self(value))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Display for Ein {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Social Security Number; the key of the owner store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ssn(u64);

impl Ssn {
    pub fn new(value: u64) -> Result<Self, CoreError> {
        validate_identifier("ssn", value)?;
        Ok(Self(value))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Display for Ssn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email address of an owner.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Email(String);

impl Email {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        validate_email(&val)?;
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Client-supplied company data. Used as the create payload and as the
/// embedded copy carried by an [`Owner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanyFields {
    pub ein: Ein,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// Stored company record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Company {
    pub ein: Ein,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Company {
    /// Build a stored record; both timestamps start at `now`.
    pub fn new(fields: CompanyFields, now: SystemTime) -> Self {
        Self {
            ein: fields.ein,
            name: fields.name,
            street: fields.street,
            city: fields.city,
            state: fields.state,
            postal_code: fields.postal_code,
            created_at: now,
            updated_at: now,
        }
    }

    /// The client-visible fields without timestamps.
    pub fn fields(&self) -> CompanyFields {
        CompanyFields {
            ein: self.ein,
            name: self.name.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
        }
    }

    /// Overwrite every client field, keeping `ein` and `created_at`.
    pub fn replace_with(&mut self, fields: CompanyFields, now: SystemTime) {
        self.name = fields.name;
        self.street = fields.street;
        self.city = fields.city;
        self.state = fields.state;
        self.postal_code = fields.postal_code;
        self.updated_at = now;
    }

    pub fn apply_patch(&mut self, patch: CompanyPatch, now: SystemTime) {
        if let Some(street) = patch.street {
            self.street = street;
        }
        if let Some(city) = patch.city {
            self.city = city;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(postal_code) = patch.postal_code {
            self.postal_code = postal_code;
        }
        self.updated_at = now;
    }
}

/// Partial company update. EIN and name are not patchable.
///
/// `None` leaves a field unchanged; for optional fields `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompanyPatch {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<Option<String>>,
    pub postal_code: Option<Option<String>>,
}

/// Input data for creating (or fully replacing) an owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOwner {
    /// Allocated by the service when not supplied.
    pub ssn: Option<Ssn>,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub companies: Vec<CompanyFields>,
}

/// Stored owner record. Embedded companies are value copies with no link
/// back to the company store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    pub ssn: Ssn,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub companies: Vec<CompanyFields>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Owner {
    pub fn new(ssn: Ssn, input: NewOwner, now: SystemTime) -> Self {
        Self {
            ssn,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            birth_date: input.birth_date,
            companies: input.companies,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every client field, keeping `ssn` and `created_at`.
    pub fn replace_with(&mut self, input: NewOwner, now: SystemTime) {
        self.first_name = input.first_name;
        self.last_name = input.last_name;
        self.email = input.email;
        self.phone = input.phone;
        self.birth_date = input.birth_date;
        self.companies = input.companies;
        self.updated_at = now;
    }

    pub fn apply_patch(&mut self, patch: OwnerPatch, now: SystemTime) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(birth_date) = patch.birth_date {
            self.birth_date = birth_date;
        }
        if let Some(companies) = patch.companies {
            self.companies = companies;
        }
        self.updated_at = now;
    }
}

/// Partial owner update. `companies` replaces the whole embedded list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<Option<String>>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub companies: Option<Vec<CompanyFields>>,
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Repository port for company records keyed by EIN.
pub trait CompanyRepository: Send + Sync {
    /// Store a new company; `Conflict` if the EIN is taken.
    fn insert(&self, company: Company) -> Result<Company, CoreError>;
    fn get(&self, ein: &Ein) -> Result<Company, CoreError>;
    /// Mutate an existing record in place under the store lock.
    fn update(
        &self,
        ein: &Ein,
        apply: &mut dyn FnMut(&mut Company),
    ) -> Result<Company, CoreError>;
    fn delete(&self, ein: &Ein) -> Result<Company, CoreError>;
    fn list(&self, filter: &CompanyFilter) -> Result<Vec<Company>, CoreError>;
}

/// Repository port for owner records keyed by SSN.
pub trait OwnerRepository: Send + Sync {
    /// Store a new owner; `Conflict` if the SSN is taken.
    fn insert(&self, owner: Owner) -> Result<Owner, CoreError>;
    fn get(&self, ssn: &Ssn) -> Result<Owner, CoreError>;
    fn update(&self, ssn: &Ssn, apply: &mut dyn FnMut(&mut Owner)) -> Result<Owner, CoreError>;
    fn delete(&self, ssn: &Ssn) -> Result<Owner, CoreError>;
    fn list(&self, filter: &OwnerFilter) -> Result<Vec<Owner>, CoreError>;
}

/// Core domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },
    #[error("{kind} {key} already exists")]
    Conflict { kind: &'static str, key: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("repository error: {0}")]
    Repository(String),
}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - owner/company registry", pkg, ver)
}

pub mod adapters;
pub mod filter;
pub mod sample;
pub mod service;
pub mod validate;

pub use filter::{CompanyFilter, Filter, OwnerFilter};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fields() -> CompanyFields {
        CompanyFields {
            ein: Ein::new(923345678).unwrap(),
            name: "Lucky Deli".into(),
            street: "117 Broadway".into(),
            city: "New York".into(),
            state: Some("NY".into()),
            postal_code: Some("10027".into()),
        }
    }

    #[test]
    fn identifiers_reject_zero_and_overlong_values() {
        assert!(Ein::new(923345678).is_ok());
        assert!(matches!(Ein::new(0), Err(CoreError::InvalidInput(_))));
        assert!(matches!(
            Ssn::new(1_000_000_000),
            Err(CoreError::InvalidInput(_))
        ));
        assert_eq!(Ssn::new(917260053).unwrap().to_string(), "917260053");
    }

    #[test]
    fn email_basic_validation() {
        assert!(Email::new("apple@gmail.com").is_ok());
        assert!(matches!(
            Email::new("not-an-email"),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn company_patch_keeps_unsupplied_fields_and_clears_explicit_nulls() {
        let t0 = SystemTime::UNIX_EPOCH;
        let t1 = t0 + Duration::from_secs(60);
        let mut company = Company::new(fields(), t0);

        company.apply_patch(
            CompanyPatch {
                city: Some("Queens".into()),
                state: Some(None),
                ..Default::default()
            },
            t1,
        );

        assert_eq!(company.city, "Queens");
        assert_eq!(company.street, "117 Broadway");
        assert_eq!(company.state, None);
        assert_eq!(company.postal_code.as_deref(), Some("10027"));
        assert_eq!(company.created_at, t0);
        assert_eq!(company.updated_at, t1);
    }

    #[test]
    fn company_fields_roundtrip_through_record() {
        let company = Company::new(fields(), SystemTime::UNIX_EPOCH);
        assert_eq!(company.fields(), fields());
    }

    #[test]
    fn core_error_messages_name_the_record() {
        let err = CoreError::NotFound {
            kind: "company",
            key: "42".into(),
        };
        assert_eq!(err.to_string(), "company 42 not found");
    }
}
