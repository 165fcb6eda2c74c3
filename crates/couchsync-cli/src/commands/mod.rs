pub mod clone;
pub mod init;
pub mod push;
