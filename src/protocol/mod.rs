pub mod column;
pub mod handshake;
pub mod packet;
pub mod primitive;
pub mod query;
pub mod response;
