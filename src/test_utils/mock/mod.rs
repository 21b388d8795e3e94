//! Mocks of the connection layer and recording observers.
//!
//! [`MockConnector`](crate::connection::MockConnector) and
//! [`MockConnection`](crate::connection::MockConnection) are generated by
//! [mockall]; the helpers here preload them with answers to the system
//! table queries so control connection and pool tests only state what they
//! care about.
//!
//! [mockall]: https://docs.rs/mockall/latest/mockall/
mod mock_connection;
mod recording;

pub(crate) use mock_connection::*;
pub(crate) use recording::*;
