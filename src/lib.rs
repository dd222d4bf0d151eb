pub mod build_info;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod hooks;
pub mod ids_map;
pub mod launcher;
pub mod output;
