//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。
//!
//! 取消采用惰性删除：`cancel` 只把句柄移出待执行集合，
//! 事件本体留在堆里，出堆时发现已取消则直接丢弃。

use super::event::{Event, EventId};
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    pending: HashSet<EventId>,
    executed: u64,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行；早于当前时间的请求按当前时间处理。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let id = EventId(self.next_seq);
        trace!(now = ?self.now, seq = id.0, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at: at.max(self.now),
            id,
            ev: Box::new(ev),
        });
        self.pending.insert(id);

        debug!(queue_size = self.q.len(), "事件已加入队列");
        id
    }

    /// 调度事件在 `now + delay` 执行
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev)
    }

    /// 取消一个尚未执行的事件。已执行或已取消的句柄返回 false，不做任何事。
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.pending.remove(&id);
        trace!(seq = id.0, removed, "取消事件");
        removed
    }

    /// 事件是否仍在等待执行
    pub fn is_pending(&self, id: EventId) -> bool {
        self.pending.contains(&id)
    }

    /// 仍在等待执行的事件数（不含已取消的）
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// 已执行的事件总数
    pub fn executed_events(&self) -> u64 {
        self.executed
    }

    /// 弹出下一个未取消的事件（且时间不晚于 `until`）。
    fn pop_live(&mut self, until: SimTime) -> Option<ScheduledEvent> {
        while let Some(top) = self.q.peek() {
            if top.at > until {
                return None;
            }
            let item = self.q.pop()?;
            if self.pending.remove(&item.id) {
                return Some(item);
            }
            trace!(seq = item.id.0, "跳过已取消事件");
        }
        None
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(item) = self.pop_live(until) {
            self.now = item.at;
            self.executed += 1;
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0;
        while let Some(item) = self.pop_live(SimTime::MAX) {
            event_count += 1;
            self.executed += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                seq = item.id.0,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
