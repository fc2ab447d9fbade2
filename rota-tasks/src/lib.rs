pub mod dispatcher;
pub mod pricing;
pub mod runner;
pub mod sweeper;

pub use dispatcher::{DispatchReport, DispatcherConfig, NotificationDispatcher};
pub use pricing::PricingAdjuster;
pub use runner::{run_periodic, PeriodicTask};
pub use sweeper::{AutoCancellationSweeper, SweepConfig, SweepReport};
