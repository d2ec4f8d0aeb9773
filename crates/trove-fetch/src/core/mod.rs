//! Pure functions: no sockets, no files.

mod budget;
mod length;
mod reconcile;
mod speed;
mod validation;

pub use budget::admit;
pub use length::get_declared_length;
pub use reconcile::{LengthCheck, reconcile};
pub use speed::{average_speed, below_minimum};
pub use validation::validate_url;
