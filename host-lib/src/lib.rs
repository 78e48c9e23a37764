//! Library to support the test suite running on the host computer


pub mod config;
pub mod conn;
pub mod error;
pub mod test_stand;


pub use self::{
    config::Config,
    conn::Conn,
    error::{
        Error,
        Result,
    },
    test_stand::TestStand,
};
