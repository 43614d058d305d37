pub mod auth;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod render;
pub mod storage;
pub mod views;
