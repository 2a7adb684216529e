// Generated by bthrift. Do not edit.
pub mod colors;
pub mod model;
