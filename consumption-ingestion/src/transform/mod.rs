pub mod filter;
pub mod normalizer;

pub use filter::{admissible, filter_day, invoiced_day};
pub use normalizer::{TimeNormalizer, DEFAULT_TIMEZONE};
