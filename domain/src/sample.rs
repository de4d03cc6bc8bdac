//! Sample records used by the demo CLI and by the api-server when
//! `SEED_DEMO_DATA` is set.

use chrono::NaiveDate;

use crate::{CompanyFields, CoreError, Ein, Email, NewOwner, Ssn};

fn company(
    ein: u64,
    name: &str,
    street: &str,
    city: &str,
    state: &str,
    postal_code: &str,
) -> Result<CompanyFields, CoreError> {
    Ok(CompanyFields {
        ein: Ein::new(ein)?,
        name: name.to_string(),
        street: street.to_string(),
        city: city.to_string(),
        state: Some(state.to_string()),
        postal_code: Some(postal_code.to_string()),
    })
}

pub fn companies() -> Result<Vec<CompanyFields>, CoreError> {
    Ok(vec![
        company(923345678, "Lucky Deli", "117 Broadway", "New York", "NY", "10027")?,
        company(922345776, "Great Bakery", "112 Main St", "New York", "NY", "10028")?,
        company(556775358, "24 Pizza", "10 Downing St", "San Diego", "CA", "92003")?,
    ])
}

pub fn owners() -> Result<Vec<NewOwner>, CoreError> {
    let [deli, bakery, pizza] = <[CompanyFields; 3]>::try_from(companies()?)
        .map_err(|_| CoreError::Repository("sample company set changed".into()))?;
    Ok(vec![
        NewOwner {
            ssn: Some(Ssn::new(917260053)?),
            first_name: "Clara".to_string(),
            last_name: "Green".to_string(),
            email: Email::new("apple@gmail.com")?,
            phone: Some("+1-718-555-0053".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1999, 12, 10),
            companies: vec![deli],
        },
        NewOwner {
            ssn: Some(Ssn::new(123456778)?),
            first_name: "Jack".to_string(),
            last_name: "Reed".to_string(),
            email: Email::new("123@gmail.com")?,
            phone: Some("+1-347-222-2308".to_string()),
            birth_date: NaiveDate::from_ymd_opt(2002, 12, 9),
            companies: vec![bakery, pizza],
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_data_is_valid() {
        assert_eq!(companies().unwrap().len(), 3);
        let owners = owners().unwrap();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[1].companies[1].city, "San Diego");
    }
}
