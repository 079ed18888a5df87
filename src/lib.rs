// src/lib.rs

//! bookwatch: book catalog change tracking library.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
