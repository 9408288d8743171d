use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::authz::AdminSection;
use crate::errors::AppError;

/// Settings documents editable from the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SettingsArea {
    Company,
    Financial,
    Delivery,
    Payments,
    Analytics,
    Seo,
}

impl SettingsArea {
    pub const ALL: [SettingsArea; 6] = [
        SettingsArea::Company,
        SettingsArea::Financial,
        SettingsArea::Delivery,
        SettingsArea::Payments,
        SettingsArea::Analytics,
        SettingsArea::Seo,
    ];

    pub fn key(&self) -> &'static str {
        self.section().as_str()
    }

    pub fn section(&self) -> AdminSection {
        match self {
            SettingsArea::Company => AdminSection::Company,
            SettingsArea::Financial => AdminSection::Financial,
            SettingsArea::Delivery => AdminSection::Delivery,
            SettingsArea::Payments => AdminSection::Payments,
            SettingsArea::Analytics => AdminSection::Analytics,
            SettingsArea::Seo => AdminSection::Seo,
        }
    }

    /// Validates a raw payload and returns `(stored, public)` documents.
    pub fn prepare(&self, payload: Value) -> Result<(Value, Value), AppError> {
        match self {
            SettingsArea::Company => prepare::<CompanySettings>(payload),
            SettingsArea::Financial => prepare::<FinancialSettings>(payload),
            SettingsArea::Delivery => prepare::<DeliverySettings>(payload),
            SettingsArea::Payments => prepare::<PaymentsSettings>(payload),
            SettingsArea::Analytics => prepare::<AnalyticsSettings>(payload),
            SettingsArea::Seo => prepare::<SeoSettings>(payload),
        }
    }

    /// Converts a stored document into what readers are allowed to see.
    pub fn public_view(&self, stored: Value) -> Result<Value, AppError> {
        match self {
            SettingsArea::Payments => {
                let doc: PaymentsSettings = from_value(stored)?;
                Ok(doc.public_view())
            }
            _ => Ok(stored),
        }
    }
}

impl fmt::Display for SettingsArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SettingsArea {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingsArea::ALL
            .into_iter()
            .find(|area| area.key() == s)
            .ok_or_else(|| AppError::not_found(format!("unknown settings area: {s}")))
    }
}

pub trait SettingsDocument: Serialize + DeserializeOwned {
    fn validate(&self) -> Result<(), AppError>;

    fn public_view(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|err| AppError::bad_request(format!("invalid settings payload: {err}")))
}

fn prepare<T: SettingsDocument>(payload: Value) -> Result<(Value, Value), AppError> {
    let doc: T = from_value(payload)?;
    doc.validate()?;
    let stored = serde_json::to_value(&doc).map_err(|err| AppError::internal(err.to_string()))?;
    Ok((stored, doc.public_view()))
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!("{field} must be zero or greater")));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanySettings {
    #[schema(example = "Oakworks Ltd")]
    pub name: String,
    #[schema(example = "hello@oakworks.test")]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl SettingsDocument for CompanySettings {
    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("name", &self.name)?;
        if !self.email.contains('@') {
            return Err(AppError::validation("email must be a valid address"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinancialSettings {
    /// VAT rate in percent
    #[schema(example = 20.0)]
    pub vat_rate: f64,
    #[serde(default)]
    pub vat_number: Option<String>,
    #[schema(example = "GBP")]
    pub currency: String,
    #[serde(default = "default_true")]
    pub prices_include_vat: bool,
}

fn default_true() -> bool {
    true
}

impl SettingsDocument for FinancialSettings {
    fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=100.0).contains(&self.vat_rate) {
            return Err(AppError::validation("vat_rate must be between 0 and 100"));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(AppError::validation("currency must be a 3 letter ISO code"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliverySettings {
    pub base_fee: f64,
    pub per_mile_fee: f64,
    #[serde(default)]
    pub free_delivery_threshold: Option<f64>,
    pub max_distance_miles: f64,
}

impl SettingsDocument for DeliverySettings {
    fn validate(&self) -> Result<(), AppError> {
        require_non_negative("base_fee", self.base_fee)?;
        require_non_negative("per_mile_fee", self.per_mile_fee)?;
        if let Some(threshold) = self.free_delivery_threshold {
            require_non_negative("free_delivery_threshold", threshold)?;
        }
        if !self.max_distance_miles.is_finite() || self.max_distance_miles <= 0.0 {
            return Err(AppError::validation("max_distance_miles must be greater than zero"));
        }
        Ok(())
    }
}

/// Gateway credentials. The secret key is stored as-is and never read back.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentsSettings {
    #[schema(example = "stripe")]
    pub provider: String,
    pub publishable_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub sandbox: bool,
}

impl PaymentsSettings {
    pub fn secret_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.secret_key.as_bytes());
        hex::encode(digest)
    }
}

impl SettingsDocument for PaymentsSettings {
    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("provider", &self.provider)?;
        require_non_empty("publishable_key", &self.publishable_key)?;
        require_non_empty("secret_key", &self.secret_key)
    }

    fn public_view(&self) -> Value {
        serde_json::json!({
            "provider": self.provider,
            "publishable_key": self.publishable_key,
            "secret_key_fingerprint": self.secret_fingerprint(),
            "sandbox": self.sandbox,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsSettings {
    /// Empty disables tracking
    #[schema(example = "G-ABC123XYZ")]
    #[serde(default)]
    pub tracking_id: String,
}

impl SettingsDocument for AnalyticsSettings {
    fn validate(&self) -> Result<(), AppError> {
        let id = self.tracking_id.trim();
        if id.is_empty() || id.starts_with("G-") || id.starts_with("UA-") {
            return Ok(());
        }
        Err(AppError::validation("tracking_id must start with G- or UA-"))
    }
}

const META_TITLE_MAX: usize = 70;
const META_DESCRIPTION_MAX: usize = 160;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SeoSettings {
    pub meta_title: String,
    pub meta_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SettingsDocument for SeoSettings {
    fn validate(&self) -> Result<(), AppError> {
        if self.meta_title.chars().count() > META_TITLE_MAX {
            return Err(AppError::validation(format!("meta_title must be at most {META_TITLE_MAX} characters")));
        }
        if self.meta_description.chars().count() > META_DESCRIPTION_MAX {
            return Err(AppError::validation(format!(
                "meta_description must be at most {META_DESCRIPTION_MAX} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub area: SettingsArea,
    /// `null` until the area is first saved
    pub value: Option<Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SectionAccess {
    pub section: AdminSection,
    pub title: String,
    pub view: bool,
    pub edit: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SectionsResponse {
    pub role: crate::authz::Role,
    pub sections: Vec<SectionAccess>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_area_is_not_found() {
        assert!(matches!("roles".parse::<SettingsArea>(), Err(AppError::NotFound(_))));
        assert_eq!("seo".parse::<SettingsArea>().unwrap(), SettingsArea::Seo);
    }

    #[test]
    fn company_requires_name_and_email() {
        let area = SettingsArea::Company;
        assert!(area.prepare(json!({"name": "Oakworks", "email": "hi@oakworks.test"})).is_ok());
        assert!(matches!(
            area.prepare(json!({"name": " ", "email": "hi@oakworks.test"})),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            area.prepare(json!({"name": "Oakworks", "email": "nope"})),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(area.prepare(json!({"name": "Oakworks"})), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn financial_bounds() {
        let area = SettingsArea::Financial;
        assert!(area.prepare(json!({"vat_rate": 20.0, "currency": "GBP"})).is_ok());
        assert!(area.prepare(json!({"vat_rate": 120.0, "currency": "GBP"})).is_err());
        assert!(area.prepare(json!({"vat_rate": 20.0, "currency": "gbp"})).is_err());
    }

    #[test]
    fn delivery_rejects_negative_fees() {
        let area = SettingsArea::Delivery;
        let ok = json!({"base_fee": 50.0, "per_mile_fee": 1.5, "max_distance_miles": 100.0});
        assert!(area.prepare(ok).is_ok());
        let bad = json!({"base_fee": -1.0, "per_mile_fee": 1.5, "max_distance_miles": 100.0});
        assert!(area.prepare(bad).is_err());
        let far = json!({"base_fee": 1.0, "per_mile_fee": 1.5, "max_distance_miles": 0.0});
        assert!(area.prepare(far).is_err());
    }

    #[test]
    fn payments_public_view_hides_secret() {
        let payload = json!({
            "provider": "stripe",
            "publishable_key": "pk_test_1",
            "secret_key": "sk_test_1",
            "sandbox": true
        });
        let (stored, public) = SettingsArea::Payments.prepare(payload).unwrap();
        assert_eq!(stored["secret_key"], "sk_test_1");
        assert!(public.get("secret_key").is_none());
        assert_eq!(public["secret_key_fingerprint"].as_str().map(str::len), Some(64));

        let reread = SettingsArea::Payments.public_view(stored).unwrap();
        assert_eq!(reread, public);
    }

    #[test]
    fn analytics_tracking_id_prefix() {
        let area = SettingsArea::Analytics;
        assert!(area.prepare(json!({"tracking_id": "G-XYZ"})).is_ok());
        assert!(area.prepare(json!({"tracking_id": ""})).is_ok());
        assert!(area.prepare(json!({"tracking_id": "XYZ"})).is_err());
    }

    #[test]
    fn seo_length_limits() {
        let area = SettingsArea::Seo;
        assert!(area
            .prepare(json!({"meta_title": "Oak Gazebos", "meta_description": "Handmade oak structures"}))
            .is_ok());
        let long = "x".repeat(71);
        assert!(area.prepare(json!({"meta_title": long, "meta_description": ""})).is_err());
    }
}
