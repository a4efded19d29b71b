mod network_integration;
mod routing_table;
mod sim_time;
mod tcp;
mod viz_meta;
