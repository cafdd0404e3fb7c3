pub mod admin_auth;
pub mod appointments;
pub mod blog;
pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod dashboard;
pub mod forms;
pub mod health;
pub mod inventory;
pub mod monitoring;
pub mod notifications;
pub mod orders;
pub mod prescriptions;
pub mod system;
