pub mod action;
pub mod device;
pub mod installation;
pub mod labor;
pub mod quote;
