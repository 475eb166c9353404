use serde::{Deserialize, Serialize};

/// Every key an extractor is expected to fill, in the order the extraction contract lists them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    QNo,
    Date,
    CompanyName,
    CustomerName,
    Product,
    Quantity,
    Rate,
    Units,
    Hsn,
    Email,
}

impl FieldName {
    pub const ALL: [FieldName; 10] = [
        FieldName::QNo,
        FieldName::Date,
        FieldName::CompanyName,
        FieldName::CustomerName,
        FieldName::Product,
        FieldName::Quantity,
        FieldName::Rate,
        FieldName::Units,
        FieldName::Hsn,
        FieldName::Email,
    ];

    /// Checked in this order, so the first reported gap is stable.
    pub const REQUIRED: [FieldName; 5] = [
        FieldName::CustomerName,
        FieldName::Product,
        FieldName::Email,
        FieldName::Quantity,
        FieldName::Rate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QNo => "q_no",
            Self::Date => "date",
            Self::CompanyName => "company_name",
            Self::CustomerName => "customer_name",
            Self::Product => "product",
            Self::Quantity => "quantity",
            Self::Rate => "rate",
            Self::Units => "units",
            Self::Hsn => "hsn",
            Self::Email => "email",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == key)
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped extractor output. Absent values are empty strings; nothing is validated here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateFields {
    pub q_no: String,
    pub date: String,
    pub company_name: String,
    pub customer_name: String,
    pub product: String,
    pub quantity: String,
    pub rate: String,
    pub units: String,
    pub hsn: String,
    pub email: String,
}

impl CandidateFields {
    pub fn get(&self, field: FieldName) -> &str {
        match field {
            FieldName::QNo => &self.q_no,
            FieldName::Date => &self.date,
            FieldName::CompanyName => &self.company_name,
            FieldName::CustomerName => &self.customer_name,
            FieldName::Product => &self.product,
            FieldName::Quantity => &self.quantity,
            FieldName::Rate => &self.rate,
            FieldName::Units => &self.units,
            FieldName::Hsn => &self.hsn,
            FieldName::Email => &self.email,
        }
    }

    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        let slot = match field {
            FieldName::QNo => &mut self.q_no,
            FieldName::Date => &mut self.date,
            FieldName::CompanyName => &mut self.company_name,
            FieldName::CustomerName => &mut self.customer_name,
            FieldName::Product => &mut self.product,
            FieldName::Quantity => &mut self.quantity,
            FieldName::Rate => &mut self.rate,
            FieldName::Units => &mut self.units,
            FieldName::Hsn => &mut self.hsn,
            FieldName::Email => &mut self.email,
        };
        *slot = value.into();
    }

    pub fn is_blank(&self, field: FieldName) -> bool {
        self.get(field).trim().is_empty()
    }

    pub fn missing_required(&self) -> Vec<FieldName> {
        FieldName::REQUIRED.into_iter().filter(|field| self.is_blank(*field)).collect()
    }
}
