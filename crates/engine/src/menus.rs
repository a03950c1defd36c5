//! Menu codes and the text shown on the handset.

use shamba_core::RegistrationRecord;

/// County menu codes. `8` is "Other".
pub const COUNTIES: [(&str, &str); 7] = [
    ("1", "Nairobi"),
    ("2", "Kiambu"),
    ("3", "Machakos"),
    ("4", "Nakuru"),
    ("5", "Meru"),
    ("6", "Kisumu"),
    ("7", "Mombasa"),
];

/// Crop menu codes. `9` is "Other".
pub const CROPS: [(&str, &str); 8] = [
    ("1", "Maize"),
    ("2", "Wheat"),
    ("3", "Rice"),
    ("4", "Beans"),
    ("5", "Potatoes"),
    ("6", "Tea"),
    ("7", "Coffee"),
    ("8", "Sugarcane"),
];

pub const OTHER_COUNTY: &str = "8";
pub const OTHER_CROP: &str = "9";

pub const REGISTER: &str = "1";
pub const CHECK_STATUS: &str = "2";
pub const EXIT: &str = "3";

pub const CONFIRM: &str = "1";
pub const CANCEL: &str = "2";

pub fn county_for(code: &str) -> Option<&'static str> {
    lookup(&COUNTIES, code)
}

pub fn crop_for(code: &str) -> Option<&'static str> {
    lookup(&CROPS, code)
}

fn lookup(table: &[(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

fn numbered(title: &str, table: &[(&str, &str)], other_code: &str) -> String {
    let mut menu = String::from(title);
    for (code, name) in table {
        menu.push_str(&format!("\n{code}. {name}"));
    }
    menu.push_str(&format!("\n{other_code}. Other"));
    menu
}

/// Acres without a trailing `.0` for whole numbers.
pub fn acres(farm_size: f64) -> String {
    format!("{farm_size} acres")
}

pub fn main_menu() -> String {
    "Welcome to Shamba Farmer Registration\n1. Register as a farmer\n2. Check registration status\n3. Exit".into()
}

pub fn name_prompt() -> String {
    "Enter your full name:".into()
}

pub fn county_menu() -> String {
    numbered("Select your county:", &COUNTIES, OTHER_COUNTY)
}

pub fn custom_county_prompt() -> String {
    "Enter your county name:".into()
}

pub fn crop_menu() -> String {
    numbered("Select your main crop:", &CROPS, OTHER_CROP)
}

pub fn custom_crop_prompt() -> String {
    "Enter your main crop:".into()
}

pub fn farm_size_prompt() -> String {
    "Enter your farm size in acres (e.g. 2.5):".into()
}

pub fn farm_size_retry() -> String {
    format!("Invalid farm size. Please enter a number greater than 0.\n{}", farm_size_prompt())
}

pub fn confirmation(name: &str, county: &str, crop: &str, farm_size: f64) -> String {
    format!(
        "Confirm your details:\nName: {name}\nCounty: {county}\nCrop: {crop}\nFarm: {}\n1. Confirm\n2. Cancel",
        acres(farm_size)
    )
}

pub fn registration_success(name: &str) -> String {
    format!("Registration successful! Thank you, {name}. You are now registered as a farmer.")
}

pub fn registration_cancelled() -> String {
    "Registration cancelled.".into()
}

pub fn invalid_confirmation() -> String {
    "Invalid option. Registration cancelled.".into()
}

pub fn status_details(record: &RegistrationRecord) -> String {
    format!(
        "You are registered.\nName: {}\nCounty: {}\nCrop: {}\nFarm: {}\nRegistered: {}",
        record.name,
        record.county,
        record.crop,
        acres(record.farm_size),
        record.registered_at.format("%d/%m/%Y %H:%M"),
    )
}

pub fn not_registered() -> String {
    "You are not registered yet. Dial again and choose 1 to register.".into()
}

pub fn goodbye() -> String {
    "Thank you for using Shamba. Goodbye!".into()
}

pub fn invalid_option() -> String {
    "Invalid option. Please try again.".into()
}

pub fn invalid_county() -> String {
    "Invalid county selection. Please try again.".into()
}

pub fn invalid_crop() -> String {
    "Invalid crop selection. Please try again.".into()
}

pub fn system_error() -> String {
    "An error occurred. Please try again later.".into()
}

pub fn request_timeout() -> String {
    "Request timed out. Please try again.".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn county_codes_map_to_names() {
        assert_eq!(county_for("1"), Some("Nairobi"));
        assert_eq!(county_for("7"), Some("Mombasa"));
        assert_eq!(county_for(OTHER_COUNTY), None);
        assert_eq!(county_for("0"), None);
    }

    #[test]
    fn crop_codes_map_to_names() {
        assert_eq!(crop_for("1"), Some("Maize"));
        assert_eq!(crop_for("8"), Some("Sugarcane"));
        assert_eq!(crop_for(OTHER_CROP), None);
    }

    #[test]
    fn county_menu_lists_every_option() {
        let menu = county_menu();
        assert!(menu.starts_with("Select your county:"));
        assert!(menu.contains("\n1. Nairobi"));
        assert!(menu.contains("\n7. Mombasa"));
        assert!(menu.ends_with("\n8. Other"));
    }

    #[test]
    fn crop_menu_ends_with_other() {
        assert!(crop_menu().ends_with("\n9. Other"));
    }

    #[test]
    fn acres_formats_without_trailing_zero() {
        assert_eq!(acres(3.5), "3.5 acres");
        assert_eq!(acres(2.0), "2 acres");
    }

    #[test]
    fn confirmation_shows_every_field() {
        let text = confirmation("Jane Wanjiru", "Nairobi", "Maize", 3.5);
        assert!(text.contains("Name: Jane Wanjiru"));
        assert!(text.contains("County: Nairobi"));
        assert!(text.contains("Crop: Maize"));
        assert!(text.contains("Farm: 3.5 acres"));
    }
}
