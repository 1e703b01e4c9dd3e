pub mod holding;
pub mod quote;
pub mod settings;
pub mod view;
