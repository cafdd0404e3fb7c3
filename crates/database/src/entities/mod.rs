//! Row types and request payloads for the repository layer.

pub mod appointment;
pub mod customer;
pub mod notification;
pub mod order;
pub mod prescription;
pub mod product;

/// Implements `as_str` and `Display` for a snake_case status enum.
macro_rules! snake_case_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use snake_case_enum;
