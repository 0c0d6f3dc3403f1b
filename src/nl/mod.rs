pub mod date;
pub mod quickadd;
