pub mod controller;
pub mod otp;
pub mod router;
pub mod service;
