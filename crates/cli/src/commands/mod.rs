pub mod chat;
pub mod serve;
pub mod status;
