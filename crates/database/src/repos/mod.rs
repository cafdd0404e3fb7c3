//! Repository implementations

pub mod appointment_repository;
pub mod customer_repository;
pub mod notification_repository;
pub mod order_repository;
pub mod prescription_repository;
pub mod product_repository;

pub use appointment_repository::AppointmentRepository;
pub use customer_repository::{CustomerRepository, InteractionRepository};
pub use notification_repository::NotificationRepository;
pub use order_repository::OrderRepository;
pub use prescription_repository::PrescriptionRepository;
pub use product_repository::ProductRepository;

/// Turn a free-text search into a `LIKE` pattern, `None` when blank.
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| format!("%{}%", term.replace('%', "").replace('_', "")))
}
