mod connection;
mod driver;
mod statement;

pub use connection::Connection;
pub use driver::Driver;
pub use statement::Statement;
