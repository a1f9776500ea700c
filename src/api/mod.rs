mod health;
mod metrics;
mod routes;
mod subscriptions;

pub use routes::api_routes;
