mod auth;
mod chat;
mod health_check;
mod helpers;
