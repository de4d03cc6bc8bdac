//! Equality filters applied by the list operations.
//!
//! A filter is a set of optional predicates. `None` means "no constraint";
//! a record matches when every present predicate equals the record's field
//! exactly. There is no partial, range or case-insensitive matching.

use crate::{Company, Owner, Ssn};

/// Predicate over a stored record.
pub trait Filter<T> {
    fn matches(&self, record: &T) -> bool;

    /// True when no predicate is active.
    fn is_empty(&self) -> bool;
}

/// A required field matches when no value is expected or the values are equal.
pub fn field_matches<V: PartialEq + ?Sized>(expected: Option<&V>, actual: &V) -> bool {
    expected.map_or(true, |e| e == actual)
}

/// An optional field that is absent never satisfies an active predicate.
pub fn optional_field_matches<V: PartialEq + ?Sized>(
    expected: Option<&V>,
    actual: Option<&V>,
) -> bool {
    match expected {
        None => true,
        Some(e) => actual.is_some_and(|a| a == e),
    }
}

/// Canonical `YYYY-MM-DD` form of a date, used by filters and in API responses.
pub fn canonical_date(date: &chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompanyFilter {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl Filter<Company> for CompanyFilter {
    fn matches(&self, c: &Company) -> bool {
        field_matches(self.name.as_deref(), c.name.as_str())
            && field_matches(self.street.as_deref(), c.street.as_str())
            && field_matches(self.city.as_deref(), c.city.as_str())
            && optional_field_matches(self.state.as_deref(), c.state.as_deref())
            && optional_field_matches(self.postal_code.as_deref(), c.postal_code.as_deref())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.street.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerFilter {
    pub ssn: Option<Ssn>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Compared against the canonical `YYYY-MM-DD` form of the birth date.
    pub birth_date: Option<String>,
    /// Matches when any embedded company is located in this city.
    pub city: Option<String>,
}

impl Filter<Owner> for OwnerFilter {
    fn matches(&self, o: &Owner) -> bool {
        let birth_date = o.birth_date.as_ref().map(canonical_date);
        field_matches(self.ssn.as_ref(), &o.ssn)
            && field_matches(self.first_name.as_deref(), o.first_name.as_str())
            && field_matches(self.last_name.as_deref(), o.last_name.as_str())
            && field_matches(self.email.as_deref(), o.email.as_str())
            && optional_field_matches(self.phone.as_deref(), o.phone.as_deref())
            && optional_field_matches(self.birth_date.as_deref(), birth_date.as_deref())
            && self
                .city
                .as_deref()
                .map_or(true, |city| o.companies.iter().any(|c| c.city == city))
    }

    fn is_empty(&self) -> bool {
        self.ssn.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.birth_date.is_none()
            && self.city.is_none()
    }
}
