pub mod dates;
pub mod secure;
