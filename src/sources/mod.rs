pub mod oauth2;
pub mod upstream;
