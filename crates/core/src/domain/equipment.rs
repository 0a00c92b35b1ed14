use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquipmentCode(pub String);

/// Equipment identity copied into a request when it is created. Later edits to the
/// catalog record never reach requests that already hold a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    pub code: EquipmentCode,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub location: Option<String>,
}

impl EquipmentSnapshot {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: EquipmentCode(code.into()),
            name: name.into(),
            brand: None,
            model: None,
            serial_number: None,
            location: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}
