use tracing::debug;

use crate::models::PriceQuote;

const BASE_RATE: f64 = 500.0;
const EXPERIENCE_BONUS_PER_YEAR: f64 = 50.0;
const DEFAULT_SPECIALIZATION: &str = "General";
const DEFAULT_DURATION_MINUTES: i32 = 30;

fn specialization_multiplier(specialization: &str) -> f64 {
    match specialization {
        "Cardiologist" => 1.5,
        "Neurologist" => 1.4,
        "Dentist" => 1.2,
        "General" => 1.0,
        _ => 1.0,
    }
}

/// Consultation price: base rate scaled by specialization plus a bonus per year of experience.
pub fn calculate_cost(specialization: Option<&str>, years_of_experience: Option<i32>) -> f64 {
    let specialization = specialization.unwrap_or(DEFAULT_SPECIALIZATION);
    let years = years_of_experience.unwrap_or(0).max(0);

    BASE_RATE * specialization_multiplier(specialization)
        + f64::from(years) * EXPERIENCE_BONUS_PER_YEAR
}

/// Consultation length in minutes for a specialization.
pub fn calculate_duration(specialization: Option<&str>) -> i32 {
    match specialization.unwrap_or(DEFAULT_SPECIALIZATION) {
        "Cardiologist" => 60,
        "Neurologist" => 50,
        "Dentist" => 30,
        "General" => 20,
        _ => DEFAULT_DURATION_MINUTES,
    }
}

pub fn quote(specialization: Option<&str>, years_of_experience: Option<i32>) -> PriceQuote {
    let quote = PriceQuote {
        specialization: specialization.unwrap_or(DEFAULT_SPECIALIZATION).to_string(),
        price: calculate_cost(specialization, years_of_experience),
        duration: calculate_duration(specialization),
    };
    debug!("Quoted {:?}", quote);
    quote
}
