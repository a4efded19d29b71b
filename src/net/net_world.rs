//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现：持有网络拓扑与安装在节点上的应用。

use super::network::Network;
use crate::app::{AppError, AppId, AppStart, AppStop, Application, SimEnv};
use crate::sim::{SimTime, Simulator, World};
use std::any::Any;
use tracing::warn;

/// 一次应用回调失败的记录
#[derive(Debug, Clone)]
pub struct AppFailure {
    pub app: AppId,
    pub at: SimTime,
    pub error: AppError,
}

/// 默认的网络世界实现：持有 Network 与应用。
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
    apps: Vec<Option<Box<dyn Application>>>,
    pub app_errors: Vec<AppFailure>,
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl NetWorld {
    /// 安装应用，返回其标识
    pub fn install_app<A: Application>(&mut self, app: A) -> AppId {
        let id = AppId(self.apps.len());
        self.apps.push(Some(Box::new(app)));
        id
    }

    /// 在 `at` 时刻启动应用
    pub fn start_app(&self, sim: &mut Simulator, app: AppId, at: SimTime) {
        sim.schedule(at, AppStart { app });
    }

    /// 在 `at` 时刻停止应用
    pub fn stop_app(&self, sim: &mut Simulator, app: AppId, at: SimTime) {
        sim.schedule(at, AppStop { app });
    }

    pub fn app(&self, id: AppId) -> Option<&dyn Application> {
        self.apps.get(id.0)?.as_deref()
    }

    /// 按具体类型取出应用（用于读取统计）
    pub fn app_as<A: Application>(&self, id: AppId) -> Option<&A> {
        self.app(id)?.as_any().downcast_ref::<A>()
    }

    pub fn app_count(&self) -> usize {
        self.apps.len()
    }

    /// 把应用临时取出，在 `SimEnv` 中调用 `f`；失败时记录错误（事件处理无法向上返回错误）。
    pub(crate) fn run_app<F>(&mut self, id: AppId, sim: &mut Simulator, f: F)
    where
        F: FnOnce(&mut dyn Application, &mut SimEnv<'_>) -> Result<(), AppError>,
    {
        let Some(mut app) = self.apps.get_mut(id.0).and_then(Option::take) else {
            warn!(app = id.0, "application not installed or re-entered");
            return;
        };
        let result = {
            let mut env = SimEnv::new(sim, &mut self.net, id);
            f(app.as_mut(), &mut env)
        };
        if let Err(error) = result {
            warn!(app = id.0, name = app.name(), %error, "application callback failed");
            self.app_errors.push(AppFailure {
                app: id,
                at: sim.now(),
                error,
            });
        }
        self.apps[id.0] = Some(app);
    }
}
