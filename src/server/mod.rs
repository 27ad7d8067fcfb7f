pub mod proxy;
pub mod routes;
pub mod server;
pub mod session;
