//! Lifecycle and timer events for applications.

use super::application::AppId;
use crate::net::NetWorld;
use crate::sim::{Event, Simulator, World};
use tracing::info;

fn net_world(world: &mut dyn World) -> &mut NetWorld {
    world
        .as_any_mut()
        .downcast_mut::<NetWorld>()
        .expect("world must be NetWorld")
}

/// Activate an application.
#[derive(Debug)]
pub struct AppStart {
    pub app: AppId,
}

impl Event for AppStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppStart { app } = *self;
        info!(app = app.0, now = %sim.now(), "▶️  start application");
        net_world(world).run_app(app, sim, |a, env| a.activate(env));
    }
}

/// Deactivate an application.
#[derive(Debug)]
pub struct AppStop {
    pub app: AppId,
}

impl Event for AppStop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppStop { app } = *self;
        info!(app = app.0, now = %sim.now(), "⏹️  stop application");
        net_world(world).run_app(app, sim, |a, env| a.deactivate(env));
    }
}

/// A timer owned by an application.
#[derive(Debug)]
pub struct AppTimer {
    pub app: AppId,
}

impl Event for AppTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppTimer { app } = *self;
        net_world(world).run_app(app, sim, |a, env| a.on_timer(env));
    }
}
