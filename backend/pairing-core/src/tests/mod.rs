mod close_code;
mod config;
mod connection_error;
mod connect_params;
mod pairing_state;
mod pending;
mod registry;
