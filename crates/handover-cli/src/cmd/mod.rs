pub mod config;
pub mod init;
pub mod persona;
pub mod run;
pub mod status;
