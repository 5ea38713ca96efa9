mod constants;
mod time;
mod type_utils;
mod value;

pub use constants::*;
pub use time::*;
pub use type_utils::*;
pub use value::*;
