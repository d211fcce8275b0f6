pub mod api_connection;
pub mod cli;
pub mod search;
