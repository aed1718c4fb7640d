pub mod codes;
pub mod email;
