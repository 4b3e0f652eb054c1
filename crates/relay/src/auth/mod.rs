pub mod lifecycle;
pub mod middleware;
pub mod password;
pub mod session;
