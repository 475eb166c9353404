pub mod fields;
pub mod outcome;
pub mod quotation;
pub mod request;
