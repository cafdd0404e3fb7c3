pub mod checkout;
pub mod customers;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod inventory;
pub mod validation;

pub use error::ServiceError;
