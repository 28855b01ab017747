// Catalog and pricing
pub mod catalog;
pub mod pricing;

// Order lifecycle
pub mod order_lifecycle;
pub mod orders;

// Payment reconciliation
pub mod payments;
