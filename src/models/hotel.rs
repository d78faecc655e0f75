//! Hotel catalog record.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::models::Record;

/// A hotel in the catalog. Identified by a string id assigned by the system of record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub rating: f64,
    pub amenities: Vec<String>,
}

impl Record for Hotel {
    type Id = String;

    const ENTITY: &'static str = "hotel";
    const COLLECTION: &'static str = "hotels";

    fn id(&self) -> Option<&String> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::Validation("hotel name is required".into()));
        }
        if !self.rating.is_finite() || self.rating < 0.0 {
            return Err(ServiceError::Validation(format!(
                "invalid rating {}",
                self.rating
            )));
        }
        Ok(())
    }

    fn merge(&mut self, patch: Self) -> bool {
        let mut touched = false;
        for (field, value) in [
            (&mut self.name, patch.name),
            (&mut self.address, patch.address),
            (&mut self.city, patch.city),
            (&mut self.state, patch.state),
        ] {
            if !value.is_empty() {
                *field = value;
                touched = true;
            }
        }
        if patch.rating != 0.0 {
            self.rating = patch.rating;
            touched = true;
        }
        if !patch.amenities.is_empty() {
            self.amenities = patch.amenities;
            touched = true;
        }
        touched
    }

    fn search_text(&self) -> String {
        let mut text = vec![
            self.name.as_str(),
            self.address.as_str(),
            self.city.as_str(),
            self.state.as_str(),
        ];
        text.extend(self.amenities.iter().map(String::as_str));
        text.join(" ")
    }

    fn rank(&self) -> f64 {
        self.rating
    }
}
