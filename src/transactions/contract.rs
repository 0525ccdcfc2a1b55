use askama::Template;
use serde::Serialize;

use super::repo::TransactionRecord;
use crate::listings::repo::Listing;
use crate::users::repo::UserRecord;

/// Flattened view of a transaction used to render the service agreement.
/// The provider (offering user) appears as the tradesman, the requesting
/// user as the client.
#[derive(Debug, Serialize, Template)]
#[template(path = "contract.txt")]
pub struct ContractData {
    pub tradesman_name: String,
    pub tradesman_profession: String,
    pub tradesman_phone: String,
    pub tradesman_city: String,
    pub tradesman_country: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_city: String,
    pub client_country: String,
    pub listing_title: String,
    pub listing_description: String,
    pub price: f64,
    pub currency_code: String,
    pub job_start_date: String,
    pub job_end_date: String,
    pub date_created: String,
    pub details_from_offered: String,
    pub details_from_offering: String,
    pub status: String,
}

impl ContractData {
    pub fn assemble(
        transaction: &TransactionRecord,
        listing: &Listing,
        client: &UserRecord,
        tradesman: &UserRecord,
    ) -> Self {
        ContractData {
            tradesman_name: format!("{} {}", tradesman.first_name, tradesman.last_name),
            tradesman_profession: tradesman.profession.clone(),
            tradesman_phone: tradesman.phone_number.clone(),
            tradesman_city: tradesman.city.clone(),
            tradesman_country: tradesman.country.clone(),
            client_name: format!("{} {}", client.first_name, client.last_name),
            client_phone: client.phone_number.clone(),
            client_city: client.city.clone(),
            client_country: client.country.clone(),
            listing_title: listing.title.clone(),
            listing_description: listing.description.clone(),
            price: transaction.price,
            currency_code: transaction.currency_code.clone(),
            job_start_date: transaction.job_start_date.to_string(),
            job_end_date: transaction.job_end_date.to_string(),
            date_created: transaction.date_created.date().to_string(),
            details_from_offered: transaction.details_from_offered.clone(),
            details_from_offering: transaction.details_from_offering.clone(),
            status: transaction.status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContractData {
        ContractData {
            tradesman_name: "Maya Khoury".into(),
            tradesman_profession: "Electrician".into(),
            tradesman_phone: "555-0002".into(),
            tradesman_city: "Tripoli".into(),
            tradesman_country: "Lebanon".into(),
            client_name: "Adam Hassan".into(),
            client_phone: "555-0001".into(),
            client_city: "Beirut".into(),
            client_country: "Lebanon".into(),
            listing_title: "Rewire kitchen".into(),
            listing_description: "Replace old wiring and add outlets".into(),
            price: 250.0,
            currency_code: "USD".into(),
            job_start_date: "2024-06-01".into(),
            job_end_date: "2024-06-03".into(),
            date_created: "2024-05-20".into(),
            details_from_offered: "Access from 9am".into(),
            details_from_offering: "Materials included".into(),
            status: "Accepted".into(),
        }
    }

    #[test]
    fn contract_renders_both_parties_and_terms() {
        let text = sample().render().unwrap();
        assert!(text.contains("Maya Khoury"));
        assert!(text.contains("Electrician"));
        assert!(text.contains("Adam Hassan"));
        assert!(text.contains("Rewire kitchen"));
        assert!(text.contains("250"));
        assert!(text.contains("USD"));
        assert!(text.contains("2024-06-01"));
        assert!(text.contains("Materials included"));
    }
}
