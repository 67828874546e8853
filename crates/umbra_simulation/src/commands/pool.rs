//! CommandPool<T> - bounded pool переиспользуемых команд.
//!
//! `get()` отдаёт экземпляр по значению: пока вызывающий держит его, pool не может выдать
//! его повторно. `give_back()` всегда делает `reset()` перед возвратом в idle list.

use crate::config::PoolConfig;

/// Команда, которую можно вернуть в исходное состояние
pub trait Resettable: Default {
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStatistics {
    pub total_gets: u64,
    pub total_returns: u64,
    pub created: u64,
    /// Сколько раз get() вернул None
    pub exhausted: u64,
}

#[derive(Debug)]
pub struct CommandPool<T: Resettable> {
    label: &'static str,
    config: PoolConfig,
    idle: Vec<T>,
    in_use: usize,
    stats: PoolStatistics,
}

impl<T: Resettable> CommandPool<T> {
    pub fn new(label: &'static str, config: PoolConfig) -> Self {
        let mut pool = Self {
            label,
            config,
            idle: Vec::with_capacity(config.max_size),
            in_use: 0,
            stats: PoolStatistics::default(),
        };
        pool.prewarm(config.prewarm_count);
        pool
    }

    /// Создаёт экземпляры заранее (не больше max_size)
    pub fn prewarm(&mut self, count: usize) {
        let room = self.config.max_size.saturating_sub(self.idle.len() + self.in_use);
        for _ in 0..count.min(room) {
            self.idle.push(T::default());
            self.stats.created += 1;
        }
    }

    /// None - pool исчерпан (все max_size экземпляров на руках)
    pub fn get(&mut self) -> Option<T> {
        let item = match self.idle.pop() {
            Some(item) => item,
            None if self.total_instances() < self.config.max_size => {
                self.stats.created += 1;
                T::default()
            }
            None => {
                self.stats.exhausted += 1;
                crate::log_warning(&format!(
                    "CommandPool<{}>: exhausted ({} in use)",
                    self.label, self.in_use
                ));
                return None;
            }
        };
        self.in_use += 1;
        self.stats.total_gets += 1;
        Some(item)
    }

    pub fn give_back(&mut self, mut item: T) {
        item.reset();
        self.in_use = self.in_use.saturating_sub(1);
        self.stats.total_returns += 1;
        if self.idle.len() + self.in_use < self.config.max_size {
            self.idle.push(item);
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn total_instances(&self) -> usize {
        self.idle.len() + self.in_use
    }

    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    pub fn statistics(&self) -> PoolStatistics {
        self.stats
    }

    /// (gets - returns) / gets
    pub fn utilization(&self) -> f32 {
        if self.stats.total_gets == 0 {
            0.0
        } else {
            self.in_use as f32 / self.stats.total_gets as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Probe {
        value: u32,
    }

    impl Resettable for Probe {
        fn reset(&mut self) {
            *self = Self::default();
        }
    }

    fn pool(max_size: usize, prewarm_count: usize) -> CommandPool<Probe> {
        CommandPool::new("probe", PoolConfig { max_size, prewarm_count })
    }

    #[test]
    fn test_prewarm_fills_idle_list() {
        let pool = pool(8, 2);
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.statistics().created, 2);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut pool = pool(2, 0);
        let a = pool.get().expect("first");
        let _b = pool.get().expect("second");

        assert!(pool.get().is_none());
        assert_eq!(pool.statistics().exhausted, 1);

        pool.give_back(a);
        assert!(pool.get().is_some(), "после возврата экземпляр снова доступен");
    }

    #[test]
    fn test_returned_items_are_reset() {
        let mut pool = pool(1, 0);
        let mut item = pool.get().unwrap();
        item.value = 42;
        pool.give_back(item);

        assert_eq!(pool.get().unwrap(), Probe::default());
    }

    #[test]
    fn test_utilization() {
        let mut pool = pool(4, 0);
        assert_eq!(pool.utilization(), 0.0);

        let a = pool.get().unwrap();
        let _b = pool.get().unwrap();
        assert_eq!(pool.utilization(), 1.0);

        pool.give_back(a);
        assert_eq!(pool.utilization(), 0.5);
        assert_eq!(pool.in_use(), 1);
    }
}
