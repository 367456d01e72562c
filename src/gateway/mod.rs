//! HTTP and Server-Sent Events gateway using Actix Web.
//!
//! The gateway exposes the supervisor and archive operations to a browser UI
//! as a small REST-like API, and streams every notification over SSE at
//! `GET /events`. Authentication (bearer token) and CORS are handled by
//! middleware.
//!
//! # Examples
//!
//! Mounting the routes in a custom Actix application:
//!
//! ```no_run
//! use actix_web::{App, web};
//! use mineserve::{Config, Mineserve, gateway};
//!
//! let mineserve = Mineserve::new(Config::default());
//! let app = App::new()
//!     .app_data(web::Data::new(mineserve))
//!     .configure(gateway::routes);
//! ```

pub mod actix_error;
pub mod auth;
pub mod events;
pub mod handlers;
mod server;

pub use server::{GatewayHandle, routes, start_gateway};
