use std::sync::atomic::{AtomicUsize, Ordering};

use super::Tier;

/// 内部解析统计信息（原子计数器）
#[derive(Default)]
pub(crate) struct InnerStats {
    total_resolutions: AtomicUsize,
    queue_hits: AtomicUsize,
    stub_hits: AtomicUsize,
    factory_hits: AtomicUsize,
    constructed: AtomicUsize,
    failures: AtomicUsize,
}

impl InnerStats {
    pub(crate) fn record(&self, tier: Tier) {
        self.total_resolutions.fetch_add(1, Ordering::Relaxed);
        let counter = match tier {
            Tier::Queue => &self.queue_hits,
            Tier::Stub => &self.stub_hits,
            Tier::Factory => &self.factory_hits,
            Tier::Default => &self.constructed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.total_resolutions.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RegistryStats {
        RegistryStats {
            total_resolutions: self.total_resolutions.load(Ordering::Relaxed),
            queue_hits: self.queue_hits.load(Ordering::Relaxed),
            stub_hits: self.stub_hits.load(Ordering::Relaxed),
            factory_hits: self.factory_hits.load(Ordering::Relaxed),
            constructed: self.constructed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.total_resolutions,
            &self.queue_hits,
            &self.stub_hits,
            &self.factory_hits,
            &self.constructed,
            &self.failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 解析统计信息快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_resolutions: usize,
    pub queue_hits: usize,
    pub stub_hits: usize,
    pub factory_hits: usize,
    pub constructed: usize,
    pub failures: usize,
}

impl RegistryStats {
    /// 获取总解析次数
    pub fn total(&self) -> usize {
        self.total_resolutions
    }

    /// 被覆盖层拦截的解析次数
    pub fn overridden(&self) -> usize {
        self.queue_hits + self.stub_hits + self.factory_hits
    }

    /// 覆盖命中率
    pub fn override_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.overridden() as f64 / self.total() as f64
        }
    }
}
