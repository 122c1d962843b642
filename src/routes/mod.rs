// Export all route modules
pub mod analysis;

// Re-export all route handlers for easy importing
pub use analysis::*;
