use chrono::{DateTime, NaiveDate, Utc};

/// # Summary
/// 时钟接口，隔离系统时间，供历史下载窗口计算使用。
pub trait Clock: Send + Sync {
    /// 当前时刻
    fn now(&self) -> DateTime<Utc>;

    /// 当前 UTC 日期
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// 直接读取操作系统时间的真实时钟。
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 固定在某一时刻的时钟，用于测试下载日期区间。
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
