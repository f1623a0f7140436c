pub mod fragment;
pub mod message;
pub mod tool;
