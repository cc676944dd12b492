pub mod payments;
pub mod reconciliation;
pub mod sweep;

pub use payments::PaymentService;
pub use reconciliation::ReconcileAction;
pub use sweep::SweepReport;
