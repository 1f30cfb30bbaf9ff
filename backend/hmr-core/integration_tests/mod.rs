mod client;
mod helpers;
mod loader;
