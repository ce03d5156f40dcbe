//! Domain entities: the hosts the client knows about and the tuning settings.
//!
//! Nothing in here performs I/O.  Persistence lives in the client crate's
//! storage layer, which serializes these types with serde.

pub mod device;
pub mod settings;
