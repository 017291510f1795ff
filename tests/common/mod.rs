#![allow(dead_code)]

pub mod nodes;
pub mod stores;
