pub mod chat;
pub mod core;
pub mod db;
pub mod geo;
pub mod jobs;
pub mod models;
pub mod routes;
pub mod tutor_connect_web_server;
