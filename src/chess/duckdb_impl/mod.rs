pub(crate) mod bind_info;
pub mod scalar;
pub mod string;
