pub mod aggregate;
pub mod cache;
pub mod credentials;
pub mod display;
pub mod filter;
pub mod loader;
pub mod locale;
pub mod sources;
