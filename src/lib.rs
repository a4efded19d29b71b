pub mod app;
pub mod net;
pub mod proto;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod topo;
pub mod viz;

#[cfg(test)]
mod test;
