//! probmark server: problem bookmarking with a search index kept in step
//! with the relational store.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod password;
pub mod repository;
pub mod search;
