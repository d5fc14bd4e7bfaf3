pub mod architecture;
pub mod not_found;
